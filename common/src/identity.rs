use crate::config::SessionConfig;
use crate::error::WardenError;
use crate::native::wide::string_from_wide_ptr;
use crate::native::{GroupNameInfo0, NetApi, NetQuery, acquire_listing};

/// Host-identity lookups the session correlator leans on.
pub trait HostIdentity {
    fn local_host_name(&self) -> String;

    #[allow(clippy::missing_errors_doc)]
    fn is_local_user_admin(&self, username: &str) -> Result<bool, WardenError>;

    #[allow(clippy::missing_errors_doc)]
    fn is_domain_user_admin(&self, username: &str, dns_domain: &str) -> Result<bool, WardenError>;
}

/// Group-membership checks answered through the Net* user-group listings.
pub struct NetHostIdentity<'a, A: NetApi + ?Sized> {
    api: &'a A,
    host_name: String,
    local_admin_group: String,
    domain_admin_group: String,
}

impl<'a, A: NetApi + ?Sized> NetHostIdentity<'a, A> {
    pub fn new(api: &'a A, host_name: impl Into<String>, cfg: &SessionConfig) -> Self {
        Self {
            api,
            host_name: host_name.into(),
            local_admin_group: cfg.local_admin_group.clone(),
            domain_admin_group: cfg.domain_admin_group.clone(),
        }
    }

    #[allow(unsafe_code)]
    fn member_of(&self, query: &NetQuery<'_>, group: &str) -> Result<bool, WardenError> {
        let buffer = match acquire_listing(self.api, query) {
            Ok(buffer) => buffer,
            Err(WardenError::NullResult { .. }) => return Ok(false),
            Err(e) => return Err(e),
        };
        // SAFETY: both group queries are level 0, one name pointer per slot.
        let mut records = unsafe { buffer.records::<GroupNameInfo0>() }?;
        Ok(records.any(|r| {
            // SAFETY: the name points into the buffer borrowed above.
            let name = unsafe { string_from_wide_ptr(r.name) };
            eq_ignore_case(&name, group)
        }))
    }
}

impl<A: NetApi + ?Sized> HostIdentity for NetHostIdentity<'_, A> {
    fn local_host_name(&self) -> String {
        self.host_name.clone()
    }

    fn is_local_user_admin(&self, username: &str) -> Result<bool, WardenError> {
        self.member_of(
            &NetQuery::UserLocalGroups { username },
            &self.local_admin_group,
        )
    }

    fn is_domain_user_admin(&self, username: &str, dns_domain: &str) -> Result<bool, WardenError> {
        if dns_domain.trim().is_empty() {
            return Ok(false);
        }
        self.member_of(
            &NetQuery::UserGroups {
                server: dns_domain,
                username,
            },
            &self.domain_admin_group,
        )
    }
}

pub(crate) fn eq_ignore_case(a: &str, b: &str) -> bool {
    a == b || a.to_uppercase() == b.to_uppercase()
}
