//! A [`PrincipalResolver`] that ignores the credential entirely and always resolves to
//! whichever principal `config.yml` names (SPEC_FULL §6 "Principal resolution
//! transport"). Shaped like `lodestone_test_support::fakes::StaticPrincipalResolver`,
//! but kept here rather than depending on that crate directly, since it is
//! dev-dependency-only and no production binary links against it.
use async_trait::async_trait;

use lodestone_core::errors::Result;
use lodestone_core::model::Principal;
use lodestone_core::ports::PrincipalResolver;

pub struct StaticPrincipalResolver(Principal);

impl StaticPrincipalResolver {
    pub fn new(principal: Principal) -> Self {
        Self(principal)
    }
}

#[async_trait]
impl PrincipalResolver for StaticPrincipalResolver {
    async fn resolve(&self, _credential: &str) -> Result<Principal> {
        Ok(self.0.clone())
    }
}
