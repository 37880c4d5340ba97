//! Catalog Service
//!
//! The services a business offers: the service wizard, listing, soft
//! deletion, category counts and statistics.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use crate::application::dto::request::{CreateServiceRequest, PricingInput, ServiceQuery, UpdateServiceRequest};
use crate::application::dto::response::{CategoryCountResponse, ServiceStatsResponse, TopServiceResponse};
use crate::domain::services::{AccessPolicy, Actor};
use crate::domain::{Role, Service, ServiceCategory, ServiceFilter, ServiceRepository, UserRepository};
use crate::shared::error::AppError;
use crate::shared::pagination::{Page, PageRequest};
use crate::shared::snowflake::{parse_id, SnowflakeGenerator};
use crate::shared::validation::field_error;

const TOP_SERVICES: i64 = 5;

#[async_trait]
pub trait CatalogService: Send + Sync {
    async fn create(&self, actor: &Actor, request: CreateServiceRequest) -> Result<Service, CatalogError>;

    async fn list(&self, actor: &Actor, query: ServiceQuery) -> Result<Page<Service>, CatalogError>;

    async fn get(&self, actor: &Actor, id: i64) -> Result<Service, CatalogError>;

    async fn update(&self, actor: &Actor, id: i64, request: UpdateServiceRequest) -> Result<Service, CatalogError>;

    /// Soft delete: the service stops being bookable.
    async fn delete(&self, actor: &Actor, id: i64) -> Result<(), CatalogError>;

    /// Every category with its number of active services.
    async fn categories(&self, actor: &Actor) -> Result<Vec<CategoryCountResponse>, CatalogError>;

    async fn stats(&self, actor: &Actor) -> Result<ServiceStatsResponse, CatalogError>;
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Service not found")]
    NotFound,

    #[error("Only business admins can manage services")]
    Forbidden,

    #[error(transparent)]
    App(#[from] AppError),
}

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::NotFound => AppError::NotFound(err.to_string()),
            CatalogError::Forbidden => AppError::Forbidden(err.to_string()),
            CatalogError::App(e) => e,
        }
    }
}

fn parse_category(raw: &str) -> Result<ServiceCategory, AppError> {
    ServiceCategory::parse(raw).ok_or_else(|| field_error("category", "Invalid category"))
}

/// Variation names must be present and unique (case-insensitive).
fn check_pricing(pricing: &PricingInput) -> Result<(), AppError> {
    let mut seen = HashSet::new();
    for variation in &pricing.variations {
        let name = variation.name.trim().to_lowercase();
        if name.is_empty() {
            return Err(field_error("pricing.variations", "Every price option needs a name"));
        }
        if variation.price < 0.0 {
            return Err(field_error("pricing.variations", "Prices cannot be negative"));
        }
        if !seen.insert(name) {
            return Err(field_error(
                "pricing.variations",
                format!("Duplicate price option \"{}\"", variation.name.trim()),
            ));
        }
    }
    Ok(())
}

pub struct CatalogServiceImpl<S, U>
where
    S: ServiceRepository,
    U: UserRepository,
{
    service_repo: Arc<S>,
    user_repo: Arc<U>,
    id_generator: Arc<SnowflakeGenerator>,
}

impl<S, U> CatalogServiceImpl<S, U>
where
    S: ServiceRepository,
    U: UserRepository,
{
    pub fn new(service_repo: Arc<S>, user_repo: Arc<U>, id_generator: Arc<SnowflakeGenerator>) -> Self {
        Self {
            service_repo,
            user_repo,
            id_generator,
        }
    }

    fn admin_business(actor: &Actor) -> Result<i64, CatalogError> {
        actor
            .business_id
            .filter(|id| AccessPolicy::can_manage_business(actor, *id))
            .ok_or(CatalogError::Forbidden)
    }

    async fn load(&self, actor: &Actor, id: i64) -> Result<Service, CatalogError> {
        self.service_repo
            .find_by_id(id)
            .await?
            .filter(|s| AccessPolicy::can_access_business(actor, s.business_id))
            .filter(|s| s.is_active || actor.role != Role::Client)
            .ok_or(CatalogError::NotFound)
    }

    /// Parse and check assigned staff ids, dropping duplicates.
    async fn resolve_staff(&self, business_id: i64, raw_ids: &[String]) -> Result<Vec<i64>, CatalogError> {
        let mut ids = Vec::with_capacity(raw_ids.len());
        for raw in raw_ids {
            let id = parse_id(raw.trim()).ok_or_else(|| field_error("staff_ids", "Invalid staff member id"))?;
            if ids.contains(&id) {
                continue;
            }

            let is_staff = self
                .user_repo
                .find_by_id(id)
                .await?
                .is_some_and(|u| u.role.is_business_member() && u.is_active && u.belongs_to(business_id));
            if !is_staff {
                return Err(field_error("staff_ids", "Staff member not found in this business").into());
            }
            ids.push(id);
        }
        Ok(ids)
    }
}

#[async_trait]
impl<S, U> CatalogService for CatalogServiceImpl<S, U>
where
    S: ServiceRepository + 'static,
    U: UserRepository + 'static,
{
    async fn create(&self, actor: &Actor, request: CreateServiceRequest) -> Result<Service, CatalogError> {
        let business_id = Self::admin_business(actor)?;
        let category = parse_category(&request.category)?;
        check_pricing(&request.pricing)?;
        let staff_ids = self.resolve_staff(business_id, &request.staff_ids).await?;
        let now = Utc::now();

        let service = Service {
            id: self.id_generator.generate(),
            business_id,
            name: request.name.trim().to_string(),
            description: request.description.filter(|d| !d.trim().is_empty()),
            category,
            base_price: request.pricing.base_price,
            variations: request.pricing.variations,
            duration_minutes: request.duration_minutes,
            requirements: request.requirements,
            staff_ids,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        let service = self.service_repo.create(&service).await?;
        tracing::info!(service_id = service.id, business_id, category = category.as_str(), "Service created");
        Ok(service)
    }

    async fn list(&self, actor: &Actor, query: ServiceQuery) -> Result<Page<Service>, CatalogError> {
        let category = match query.category.as_deref().map(str::trim) {
            None | Some("") | Some("all") => None,
            Some(raw) => Some(parse_category(raw)?),
        };

        // Clients only ever see what they can book.
        let is_active = if actor.role == Role::Client {
            Some(true)
        } else {
            query.is_active
        };

        let filter = ServiceFilter {
            business_id: actor.tenant_scope(),
            category,
            is_active,
            search: query.search.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()),
        };
        let page = PageRequest::new(query.page, query.limit);

        let (services, total) = self.service_repo.list(&filter, page).await?;
        Ok(Page::new(services, page, total))
    }

    async fn get(&self, actor: &Actor, id: i64) -> Result<Service, CatalogError> {
        self.load(actor, id).await
    }

    async fn update(&self, actor: &Actor, id: i64, request: UpdateServiceRequest) -> Result<Service, CatalogError> {
        let mut service = self.load(actor, id).await?;
        if !AccessPolicy::can_manage_business(actor, service.business_id) {
            return Err(CatalogError::Forbidden);
        }

        if let Some(name) = request.name {
            service.name = name.trim().to_string();
        }
        if let Some(description) = request.description {
            service.description = Some(description).filter(|d| !d.trim().is_empty());
        }
        if let Some(category) = request.category {
            service.category = parse_category(&category)?;
        }
        if let Some(pricing) = request.pricing {
            check_pricing(&pricing)?;
            service.base_price = pricing.base_price;
            service.variations = pricing.variations;
        }
        if let Some(duration) = request.duration_minutes {
            service.duration_minutes = duration;
        }
        if let Some(requirements) = request.requirements {
            service.requirements = requirements;
        }
        if let Some(staff_ids) = request.staff_ids {
            service.staff_ids = self.resolve_staff(service.business_id, &staff_ids).await?;
        }
        if let Some(is_active) = request.is_active {
            service.is_active = is_active;
        }
        service.updated_at = Utc::now();

        let service = self.service_repo.update(&service).await?;
        tracing::info!(service_id = id, "Service updated");
        Ok(service)
    }

    async fn delete(&self, actor: &Actor, id: i64) -> Result<(), CatalogError> {
        let service = self.load(actor, id).await?;
        if !AccessPolicy::can_manage_business(actor, service.business_id) {
            return Err(CatalogError::Forbidden);
        }

        self.service_repo.deactivate(id).await?;
        tracing::info!(service_id = id, "Service deactivated");
        Ok(())
    }

    async fn categories(&self, actor: &Actor) -> Result<Vec<CategoryCountResponse>, CatalogError> {
        let counts: HashMap<ServiceCategory, i64> = self
            .service_repo
            .category_counts(actor.tenant_scope())
            .await?
            .into_iter()
            .collect();

        Ok(ServiceCategory::ALL
            .into_iter()
            .map(|category| CategoryCountResponse::new(category, counts.get(&category).copied().unwrap_or(0)))
            .collect())
    }

    async fn stats(&self, actor: &Actor) -> Result<ServiceStatsResponse, CatalogError> {
        if actor.role == Role::Client {
            return Err(CatalogError::Forbidden);
        }
        let scope = actor.tenant_scope();

        let (totals, by_category, top) = futures::try_join!(
            async { Ok::<_, CatalogError>(self.service_repo.stats(scope).await?) },
            self.categories(actor),
            async { Ok::<_, CatalogError>(self.service_repo.top_booked(scope, TOP_SERVICES).await?) },
        )?;

        Ok(ServiceStatsResponse {
            totals,
            by_category,
            top_services: top.into_iter().map(TopServiceResponse::from).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MockServiceRepository, MockUserRepository, PriceVariation, ServiceBookingCount, ServiceStats, User};
    use pretty_assertions::assert_eq;

    const BIZ: i64 = 100;

    fn catalog(
        services: MockServiceRepository,
        users: MockUserRepository,
    ) -> CatalogServiceImpl<MockServiceRepository, MockUserRepository> {
        CatalogServiceImpl::new(Arc::new(services), Arc::new(users), Arc::new(SnowflakeGenerator::new(1, 1)))
    }

    fn admin() -> Actor {
        Actor::new(1, Role::BusinessAdmin, Some(BIZ))
    }

    fn wizard(category: &str, variations: Vec<PriceVariation>, staff_ids: Vec<String>) -> CreateServiceRequest {
        CreateServiceRequest {
            name: "Full Groom".into(),
            description: None,
            category: category.into(),
            pricing: PricingInput {
                base_price: 60.0,
                variations,
            },
            duration_minutes: 90,
            requirements: Default::default(),
            staff_ids,
        }
    }

    fn variation(name: &str, price: f64) -> PriceVariation {
        PriceVariation {
            name: name.into(),
            price,
            duration_minutes: None,
        }
    }

    fn field_of(err: CatalogError) -> String {
        match AppError::from(err) {
            AppError::InvalidFields(errors) => errors[0].field.clone(),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_staff_cannot_create_services() {
        let svc = catalog(MockServiceRepository::new(), MockUserRepository::new());
        let staff = Actor::new(2, Role::Staff, Some(BIZ));

        let err = svc.create(&staff, wizard("grooming", vec![], vec![])).await.unwrap_err();
        assert!(matches!(err, CatalogError::Forbidden));
    }

    #[tokio::test]
    async fn test_create_rejects_unknown_category() {
        let svc = catalog(MockServiceRepository::new(), MockUserRepository::new());

        let err = svc.create(&admin(), wizard("astrology", vec![], vec![])).await.unwrap_err();
        assert_eq!(field_of(err), "category");
    }

    #[tokio::test]
    async fn test_create_rejects_duplicate_variations() {
        let svc = catalog(MockServiceRepository::new(), MockUserRepository::new());
        let variations = vec![variation("Small", 40.0), variation("small ", 45.0)];

        let err = svc.create(&admin(), wizard("grooming", variations, vec![])).await.unwrap_err();
        assert_eq!(field_of(err), "pricing.variations");
    }

    #[tokio::test]
    async fn test_create_rejects_staff_from_other_business() {
        let mut users = MockUserRepository::new();
        users.expect_find_by_id().returning(|id| {
            Ok(Some(User {
                id,
                role: Role::Staff,
                business_id: Some(999),
                ..Default::default()
            }))
        });
        let mut services = MockServiceRepository::new();
        services.expect_create().never();
        let svc = catalog(services, users);

        let err = svc
            .create(&admin(), wizard("grooming", vec![], vec!["42".into()]))
            .await
            .unwrap_err();
        assert_eq!(field_of(err), "staff_ids");
    }

    #[tokio::test]
    async fn test_create_stores_wizard_payload() {
        let mut users = MockUserRepository::new();
        users.expect_find_by_id().returning(|id| {
            Ok(Some(User {
                id,
                role: Role::Staff,
                business_id: Some(BIZ),
                ..Default::default()
            }))
        });
        let mut services = MockServiceRepository::new();
        services
            .expect_create()
            .withf(|s| s.business_id == BIZ && s.staff_ids == vec![42] && s.variations.len() == 1)
            .returning(|s| Ok(s.clone()));
        let svc = catalog(services, users);

        let service = svc
            .create(
                &admin(),
                wizard("Grooming", vec![variation("Large", 80.0)], vec!["42".into(), "42".into()]),
            )
            .await
            .unwrap();

        assert_eq!(service.category, ServiceCategory::Grooming);
        assert_eq!(service.quote(Some("large")), Some((80.0, 90)));
    }

    #[tokio::test]
    async fn test_clients_only_list_active_services() {
        let mut services = MockServiceRepository::new();
        services
            .expect_list()
            .withf(|filter, _| filter.is_active == Some(true) && filter.business_id == Some(BIZ))
            .returning(|_, _| Ok((Vec::new(), 0)));
        let svc = catalog(services, MockUserRepository::new());

        let client = Actor::new(7, Role::Client, Some(BIZ));
        let query = ServiceQuery {
            is_active: Some(false),
            ..Default::default()
        };
        svc.list(&client, query).await.unwrap();
    }

    #[tokio::test]
    async fn test_categories_include_empty_ones() {
        let mut services = MockServiceRepository::new();
        services
            .expect_category_counts()
            .returning(|_| Ok(vec![(ServiceCategory::Grooming, 3), (ServiceCategory::Walking, 1)]));
        let svc = catalog(services, MockUserRepository::new());

        let categories = svc.categories(&admin()).await.unwrap();
        assert_eq!(categories.len(), 7);
        assert_eq!(categories[0].category, "grooming");
        assert_eq!(categories[0].count, 3);
        assert!(categories.iter().filter(|c| c.count == 0).count() == 5);
    }

    #[tokio::test]
    async fn test_stats_combines_totals_categories_and_top() {
        let mut services = MockServiceRepository::new();
        services.expect_stats().returning(|_| {
            Ok(ServiceStats {
                total: 4,
                active: 3,
                inactive: 1,
                average_price: 50.0,
            })
        });
        services.expect_category_counts().returning(|_| Ok(Vec::new()));
        services
            .expect_top_booked()
            .withf(|_, limit| *limit == TOP_SERVICES)
            .returning(|_, _| {
                Ok(vec![ServiceBookingCount {
                    service_id: 30,
                    name: "Bath".into(),
                    bookings: 12,
                }])
            });
        let svc = catalog(services, MockUserRepository::new());

        let stats = svc.stats(&admin()).await.unwrap();
        assert_eq!(stats.totals.total, 4);
        assert_eq!(stats.by_category.len(), 7);
        assert_eq!(stats.top_services[0].service_id, "30");
    }

    #[tokio::test]
    async fn test_inactive_service_hidden_from_clients() {
        let mut services = MockServiceRepository::new();
        services.expect_find_by_id().returning(|id| {
            Ok(Some(Service {
                id,
                business_id: BIZ,
                is_active: false,
                ..Default::default()
            }))
        });
        let svc = catalog(services, MockUserRepository::new());

        let client = Actor::new(7, Role::Client, Some(BIZ));
        assert!(matches!(svc.get(&client, 30).await, Err(CatalogError::NotFound)));
        assert!(svc.get(&admin(), 30).await.is_ok());
    }
}
