use mandi_db::{SqlTenantRepository, TenantRepository};

use crate::commands::{to_data, with_database, CommandResult};

pub fn run(phone: &str, business_name: Option<&str>) -> CommandResult {
    let outcome = with_database("register", |pool| async move {
        SqlTenantRepository::new(pool)
            .create(phone, business_name)
            .await
            .map_err(|error| ("tenant_registration", error.to_string(), 6u8))
    });

    match outcome {
        Ok(tenant) => CommandResult::success_with_data(
            "register",
            format!("tenant {} is registered for {}", tenant.id, tenant.phone_number),
            to_data(&tenant),
        ),
        Err(failure) => failure,
    }
}
