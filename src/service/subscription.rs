//! Webhook subscription creation

use crate::domain::{
    CreateSubscriptionInput, Dialect, EventType, Resource, ResourceData, ResourceId,
    WebhookSubscription, SUBSCRIPTIONS_FOLDER,
};
use crate::error::{AppError, Result};
use crate::repository::SecurityRepository;
use crate::security::{PrincipalId, ACT_READ};
use crate::store::ObjectStore;
use crate::subscribers::{self, ObjectEvent};
use chrono::Utc;
use std::sync::Arc;
use validator::Validate;

/// Create a Zapier subscription owned by `owner` in the named site.
///
/// The site's subscription folder is created on first use. Default security
/// is applied by the lifecycle subscriber.
pub fn create_subscription<S: ObjectStore + ?Sized>(
    store: &mut S,
    site_name: &str,
    owner: &PrincipalId,
    input: CreateSubscriptionInput,
) -> Result<ResourceId> {
    input.validate()?;
    let event: EventType = input.event_type.parse().map_err(AppError::Validation)?;

    let site = store
        .find_site(site_name)
        .ok_or_else(|| AppError::NotFound(format!("Site {} not found", site_name)))?;
    let folder = match store.subscriptions_folder(site) {
        Some(folder) => folder,
        None => store.insert(Resource::new(
            site,
            ResourceData::Folder {
                name: SUBSCRIPTIONS_FOLDER.to_string(),
            },
        ))?,
    };

    let subscription = WebhookSubscription {
        target: input.target,
        event,
        dialect: Dialect::Zapier,
        owner_id: Some(owner.clone()),
        permission_id: ACT_READ,
        active: true,
        created_at: Utc::now(),
    };
    let id = store.insert(Resource::new(
        folder,
        ResourceData::WebhookSubscription(subscription),
    ))?;
    subscribers::dispatch(store, ObjectEvent::Added(id));

    tracing::info!(
        subscription_id = %id,
        site = site_name,
        owner = %owner,
        event = %event,
        "Webhook subscription created"
    );
    Ok(id)
}

pub struct SubscriptionService<R: SecurityRepository> {
    repository: Arc<R>,
}

impl<R: SecurityRepository> SubscriptionService<R> {
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    /// Create and persist a subscription.
    pub async fn subscribe(
        &self,
        site_name: &str,
        owner: &PrincipalId,
        input: CreateSubscriptionInput,
    ) -> Result<ResourceId> {
        input.validate()?;
        let mut store = self.repository.load_store().await?;
        let id = create_subscription(&mut store, site_name, owner, input)?;
        self.repository
            .commit(&store.pending_changes(), None)
            .await?;
        Ok(id)
    }
}
