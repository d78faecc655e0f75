//! Cache key formats shared by the local and distributed tiers.

use crate::models::Record;

/// `"<entity>:<id>"`, e.g. `hotel:42`.
pub fn id_key<R: Record>(id: &R::Id) -> String {
    format!("{}:{}", R::ENTITY, id)
}

/// `"<entity>:<field>:<value>"`, e.g. `user:username:alice`.
///
/// `None` for entities without a secondary attribute.
pub fn alias_key<R: Record>(alias: &str) -> Option<String> {
    R::ALIAS_FIELD.map(|field| format!("{}:{}:{}", R::ENTITY, field, alias))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Hotel, User};

    #[test]
    fn test_key_formats() {
        assert_eq!(id_key::<Hotel>(&"42".to_string()), "hotel:42");
        assert_eq!(id_key::<User>(&7), "user:7");
        assert_eq!(alias_key::<User>("alice").as_deref(), Some("user:username:alice"));
        assert_eq!(alias_key::<Hotel>("Sheraton"), None);
    }
}
