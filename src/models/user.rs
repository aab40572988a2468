use serde::{Deserialize, Serialize};

pub const ADMIN_ROLE: &str = "admin";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,  // user ID
    pub role: String, // "user" or "admin"
    pub exp: usize,   // expiration time
}

impl Claims {
    pub fn is_admin(&self) -> bool {
        self.role == ADMIN_ROLE
    }
}
