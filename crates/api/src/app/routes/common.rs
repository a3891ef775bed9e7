use axum::http::StatusCode;
use axum::response::Response;

use bikeshare_auth::{CommandAuthorization, Permission};

use crate::app::errors::json_error;
use crate::authz::authorize_command;
use crate::context::PrincipalContext;

/// Small helper wrapper to associate required permissions with a command.
pub struct CmdAuth<C> {
    pub inner: C,
    pub required: Vec<Permission>,
}

impl<C> CommandAuthorization for CmdAuth<C> {
    fn required_permissions(&self) -> &[Permission] {
        &self.required
    }
}

impl<C> CmdAuth<C> {
    pub fn new(inner: C, permission: &'static str) -> Self {
        Self {
            inner,
            required: vec![Permission::new(permission)],
        }
    }

    /// Authorize the wrapped command and hand it back, or build a 403.
    pub fn check(self, principal: &PrincipalContext) -> Result<C, Response> {
        authorize_command(principal, &self)
            .map_err(|e| json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string()))?;
        Ok(self.inner)
    }
}
