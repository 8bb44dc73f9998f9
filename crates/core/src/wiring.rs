//! Production composition of the collaborators from a [`CoreConfig`].

use crate::consents::Collaborators;
use crate::stores::FileStore;
use crate::{CompanionError, CompanionResult, CoreConfig};
use caravan::CaravanClient;
use dashboard::DashboardClient;
use std::sync::Arc;

/// Build the HTTP clients and the file-backed link store described by `cfg`.
///
/// # Errors
///
/// - `InvalidInput` if no data directory is configured. Links only exist in the store, so a
///   process without one could never serve a companion route.
/// - `Caravan` or `Dashboard` if a client cannot be built.
pub fn collaborators_from_config(cfg: &CoreConfig) -> CompanionResult<Collaborators> {
    let data_dir = cfg.data_dir().ok_or_else(|| {
        CompanionError::InvalidInput("COMPANION_DATA_DIR must be set".into())
    })?;

    let caravan = Arc::new(CaravanClient::new(cfg.caravan_url(), cfg.http_timeout())?);
    let dashboard = Arc::new(DashboardClient::new(
        cfg.dashboard_url(),
        cfg.dashboard_accept(),
        cfg.dashboard_authorization(),
        cfg.http_timeout(),
    )?);

    tracing::info!(data_dir = %data_dir.display(), "using file-backed companion store");
    let store = Arc::new(FileStore::new(data_dir));

    Ok(Collaborators {
        definitions: caravan.clone(),
        options: caravan.clone(),
        captures: caravan,
        tasks: store.clone(),
        links: store,
        record: dashboard,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::{LinkStore, TaskStore};

    #[test]
    fn data_dir_is_required() {
        let cfg = CoreConfig::new("http://caravan.local", "http://dashboard.local").unwrap();
        assert!(matches!(
            collaborators_from_config(&cfg),
            Err(CompanionError::InvalidInput(_))
        ));
    }

    #[test]
    fn unsendable_dashboard_accept_is_rejected() {
        let temp = tempfile::TempDir::new().unwrap();
        let cfg = CoreConfig::new("http://caravan.local", "http://dashboard.local")
            .unwrap()
            .with_data_dir(Some(temp.path().to_path_buf()))
            .with_dashboard_accept(Some("application/json\n".into()));
        assert!(matches!(
            collaborators_from_config(&cfg),
            Err(CompanionError::Dashboard(_))
        ));
    }

    #[tokio::test]
    async fn file_store_is_wired_to_data_dir() {
        let temp = tempfile::TempDir::new().unwrap();
        let cfg = CoreConfig::new("http://caravan.local", "http://dashboard.local")
            .unwrap()
            .with_data_dir(Some(temp.path().to_path_buf()));
        let collaborators = collaborators_from_config(&cfg).unwrap();

        let link = collaborators
            .links
            .initialise_link(companion_types::CareRequestId(1))
            .await
            .unwrap();
        assert!(temp
            .path()
            .join(crate::constants::COMPANION_DIR_NAME)
            .is_dir());
        assert_eq!(
            collaborators.tasks.tasks_for_link(&link.id).await.unwrap().len(),
            crate::task::TaskType::ALL.len()
        );
    }
}
