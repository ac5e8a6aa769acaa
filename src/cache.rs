use std::sync::OnceLock;

use crate::error::DashboardError;
use crate::generator::generate;
use crate::model::RegistrationTable;

static TABLE: OnceLock<RegistrationTable> = OnceLock::new();

/// The memoized table, generated on first use and kept until the process
/// exits. Concurrent first calls may each generate a table; only one is kept.
pub fn shared_table() -> Result<&'static RegistrationTable, DashboardError> {
    if let Some(table) = TABLE.get() {
        log::debug!("Registration table cache hit");
        return Ok(table);
    }

    log::debug!("Registration table cache miss, generating");
    let table = generate()?;
    Ok(TABLE.get_or_init(|| table))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn returns_the_same_table_every_time() {
        let first = shared_table().unwrap();
        let second = shared_table().unwrap();
        assert!(std::ptr::eq(first, second));
        assert!(!first.is_empty());
    }
}
