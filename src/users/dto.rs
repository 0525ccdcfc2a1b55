use serde::{Deserialize, Serialize};
use time::Date;

use crate::geo::Point;

/// User record as returned to clients. Deliberately has no password field:
/// read paths cannot leak the hash.
#[derive(Debug, Clone, Serialize)]
pub struct PublicUser {
    pub user_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    pub date_of_birth: Date,
    pub profession: String,
    pub location: Point,
    pub city: String,
    pub country: String,
    pub profile_image_id: Option<i64>,
}

/// Signup / self-update payload.
#[derive(Debug, Deserialize)]
pub struct UserPayload {
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    pub date_of_birth: Date,
    pub profession: String,
    pub location: Point,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct AuthRequest {
    pub phone_number: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: PublicUser,
}
