//! `tritiq-auth`: authentication and authorization boundary.
//!
//! Decoupled from HTTP and storage: the API layer resolves accounts from its
//! stores and hands this crate plain values to decide on.

pub mod authorize;
pub mod claims;
pub mod lockout;
pub mod otp;
pub mod password;
pub mod permissions;
pub mod principal;
pub mod roles;
pub mod token;
pub mod user;

pub use authorize::{
    AuthzError, authorize, ensure_can_assign_role, require_active, require_admin,
    require_current_organization, require_platform, require_super_admin,
    validate_organization_access,
};
pub use claims::{Claims, TokenValidationError, UserType, validate_claims};
pub use lockout::{LockoutPolicy, LoginState};
pub use otp::{OtpCode, OtpError, OtpPurpose};
pub use password::{
    PasswordError, check_password_policy, generate_temporary_password, hash_password,
    verify_password,
};
pub use permissions::Permission;
pub use principal::{Account, Principal};
pub use roles::Role;
pub use token::{Hs256Tokens, TokenCodec, TokenError};
pub use user::{NewUser, PlatformUser, User, UserUpdate, normalize_email};
