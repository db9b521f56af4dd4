pub mod auth_admin;
pub mod storage;

pub struct ApiUrls {
    pub auth_admin_url: String,
    pub storage_url: String,
}

impl ApiUrls {
    pub fn init() -> Self {
        Self {
            auth_admin_url: Self::get_auth_admin_url(),
            storage_url: Self::get_storage_url(),
        }
    }

    pub fn get_auth_admin_url() -> String {
        std::env::var("AUTH_ADMIN_URL").unwrap_or("http://localhost:9999/admin".to_string())
    }

    pub fn get_storage_url() -> String {
        std::env::var("STORAGE_URL").unwrap_or("http://localhost:9000/storage/v1".to_string())
    }

    /// Service-role key used for every admin/storage call. The providers
    /// reject unauthenticated requests, so an empty key only works against
    /// local development stacks.
    pub fn get_service_role_key() -> String {
        std::env::var("SERVICE_ROLE_KEY").unwrap_or_default()
    }
}
