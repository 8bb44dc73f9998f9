use crate::sources::{CaptureStore, DefinitionSource, OptionSource};
use crate::CompanionResult;
use async_trait::async_trait;
use caravan::{
    CapturesQuery, CaravanClient, ConsentCapture, ConsentDefinition, ConsentOptions,
    DefinitionsQuery, Lookup, NewConsentCapture,
};

#[async_trait]
impl DefinitionSource for CaravanClient {
    async fn list(
        &self,
        query: &DefinitionsQuery,
    ) -> CompanionResult<Lookup<Vec<ConsentDefinition>>> {
        Ok(self.definitions(query).await?)
    }
}

#[async_trait]
impl OptionSource for CaravanClient {
    async fn options(&self) -> CompanionResult<ConsentOptions> {
        Ok(CaravanClient::options(self).await?)
    }
}

#[async_trait]
impl CaptureStore for CaravanClient {
    async fn list(&self, query: &CapturesQuery) -> CompanionResult<Lookup<Vec<ConsentCapture>>> {
        Ok(self.captures(query).await?)
    }

    async fn create(&self, capture: &NewConsentCapture) -> CompanionResult<ConsentCapture> {
        Ok(self.create_capture(capture).await?)
    }
}
