//! Staff Service
//!
//! Staff accounts of a business. Managed by the business admin only.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use crate::application::dto::request::{CreateStaffRequest, PeopleQuery, UpdateStaffRequest};
use crate::application::services::auth_service::hash_password;
use crate::domain::services::{AccessPolicy, Actor};
use crate::domain::{normalize_email, Role, User, UserFilter, UserRepository};
use crate::shared::error::AppError;
use crate::shared::pagination::{Page, PageRequest};
use crate::shared::snowflake::SnowflakeGenerator;

#[async_trait]
pub trait StaffService: Send + Sync {
    async fn list(&self, actor: &Actor, query: PeopleQuery) -> Result<Page<User>, StaffError>;

    async fn create(&self, actor: &Actor, request: CreateStaffRequest) -> Result<User, StaffError>;

    async fn update(&self, actor: &Actor, id: i64, request: UpdateStaffRequest) -> Result<User, StaffError>;

    async fn deactivate(&self, actor: &Actor, id: i64) -> Result<(), StaffError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StaffError {
    #[error("Staff member not found")]
    NotFound,

    #[error("Email already registered")]
    EmailExists,

    #[error("Only business admins can manage staff")]
    Forbidden,

    #[error(transparent)]
    App(#[from] AppError),
}

impl From<StaffError> for AppError {
    fn from(err: StaffError) -> Self {
        match err {
            StaffError::NotFound => AppError::NotFound(err.to_string()),
            StaffError::EmailExists => AppError::Conflict(err.to_string()),
            StaffError::Forbidden => AppError::Forbidden(err.to_string()),
            StaffError::App(e) => e,
        }
    }
}

pub struct StaffServiceImpl<U: UserRepository> {
    user_repo: Arc<U>,
    id_generator: Arc<SnowflakeGenerator>,
}

impl<U: UserRepository> StaffServiceImpl<U> {
    pub fn new(user_repo: Arc<U>, id_generator: Arc<SnowflakeGenerator>) -> Self {
        Self { user_repo, id_generator }
    }

    fn admin_business(actor: &Actor) -> Result<i64, StaffError> {
        actor
            .business_id
            .filter(|id| AccessPolicy::can_manage_business(actor, *id))
            .ok_or(StaffError::Forbidden)
    }

    async fn load_staff(&self, actor: &Actor, id: i64) -> Result<User, StaffError> {
        let business_id = Self::admin_business(actor)?;
        self.user_repo
            .find_by_id(id)
            .await?
            .filter(|u| u.role == Role::Staff && u.belongs_to(business_id))
            .ok_or(StaffError::NotFound)
    }
}

#[async_trait]
impl<U: UserRepository + 'static> StaffService for StaffServiceImpl<U> {
    async fn list(&self, actor: &Actor, query: PeopleQuery) -> Result<Page<User>, StaffError> {
        let business_id = Self::admin_business(actor)?;

        let filter = UserFilter {
            business_id: Some(business_id),
            role: Some(Role::Staff),
            is_active: query.is_active,
            search: query.search.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()),
        };
        let page = PageRequest::new(query.page, query.limit);

        let (staff, total) = self.user_repo.list(&filter, page).await?;
        Ok(Page::new(staff, page, total))
    }

    async fn create(&self, actor: &Actor, request: CreateStaffRequest) -> Result<User, StaffError> {
        let business_id = Self::admin_business(actor)?;

        let email = normalize_email(&request.email);
        if self.user_repo.email_exists(&email).await? {
            return Err(StaffError::EmailExists);
        }

        let password_hash = hash_password(&request.password).map_err(AppError::from)?;
        let now = Utc::now();
        let user = User {
            id: self.id_generator.generate(),
            business_id: Some(business_id),
            role: Role::Staff,
            first_name: request.first_name.trim().to_string(),
            last_name: request.last_name.trim().to_string(),
            email,
            phone: request.phone.filter(|p| !p.trim().is_empty()),
            password_hash,
            created_at: now,
            updated_at: now,
            ..Default::default()
        };

        let user = self.user_repo.create(&user).await?;
        tracing::info!(staff_id = user.id, business_id, "Staff member created");
        Ok(user)
    }

    async fn update(&self, actor: &Actor, id: i64, request: UpdateStaffRequest) -> Result<User, StaffError> {
        let mut staff = self.load_staff(actor, id).await?;

        if let Some(first_name) = request.first_name {
            staff.first_name = first_name.trim().to_string();
        }
        if let Some(last_name) = request.last_name {
            staff.last_name = last_name.trim().to_string();
        }
        if let Some(phone) = request.phone {
            staff.phone = Some(phone).filter(|p| !p.trim().is_empty());
        }
        if let Some(is_active) = request.is_active {
            staff.is_active = is_active;
        }
        staff.updated_at = Utc::now();

        let staff = self.user_repo.update(&staff).await?;
        tracing::info!(staff_id = id, "Staff member updated");
        Ok(staff)
    }

    async fn deactivate(&self, actor: &Actor, id: i64) -> Result<(), StaffError> {
        let mut staff = self.load_staff(actor, id).await?;
        staff.is_active = false;
        staff.updated_at = Utc::now();
        self.user_repo.update(&staff).await?;

        tracing::info!(staff_id = id, deactivated_by = actor.user_id, "Staff member deactivated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MockUserRepository;
    use test_case::test_case;

    const BIZ: i64 = 100;

    fn service(users: MockUserRepository) -> StaffServiceImpl<MockUserRepository> {
        StaffServiceImpl::new(Arc::new(users), Arc::new(SnowflakeGenerator::new(1, 1)))
    }

    fn admin() -> Actor {
        Actor::new(1, Role::BusinessAdmin, Some(BIZ))
    }

    fn new_staff() -> CreateStaffRequest {
        CreateStaffRequest {
            first_name: "Sam".into(),
            last_name: "Lee".into(),
            email: "Sam@PetCare.test".into(),
            phone: None,
            password: "groomer-pass".into(),
        }
    }

    #[test_case(Role::Staff ; "staff")]
    #[test_case(Role::Client ; "client")]
    #[tokio::test]
    async fn test_only_admins_manage_staff(role: Role) {
        let svc = service(MockUserRepository::new());
        let actor = Actor::new(2, role, Some(BIZ));

        assert!(matches!(svc.create(&actor, new_staff()).await, Err(StaffError::Forbidden)));
        assert!(matches!(
            svc.list(&actor, PeopleQuery::default()).await,
            Err(StaffError::Forbidden)
        ));
    }

    #[tokio::test]
    async fn test_create_staff_in_admins_business() {
        let mut users = MockUserRepository::new();
        users.expect_email_exists().returning(|_| Ok(false));
        users
            .expect_create()
            .withf(|u| u.role == Role::Staff && u.business_id == Some(BIZ) && u.email == "sam@petcare.test")
            .returning(|u| Ok(u.clone()));
        let svc = service(users);

        let staff = svc.create(&admin(), new_staff()).await.unwrap();
        assert_eq!(staff.full_name(), "Sam Lee");
    }

    #[tokio::test]
    async fn test_client_account_is_not_staff() {
        let mut users = MockUserRepository::new();
        users.expect_find_by_id().returning(|id| {
            Ok(Some(User {
                id,
                role: Role::Client,
                business_id: Some(BIZ),
                ..Default::default()
            }))
        });
        users.expect_update().never();
        let svc = service(users);

        assert!(matches!(svc.deactivate(&admin(), 7).await, Err(StaffError::NotFound)));
    }

    #[tokio::test]
    async fn test_list_filters_by_staff_role() {
        let mut users = MockUserRepository::new();
        users
            .expect_list()
            .withf(|filter, _| filter.role == Some(Role::Staff) && filter.business_id == Some(BIZ))
            .returning(|_, _| Ok((Vec::new(), 0)));
        let svc = service(users);

        svc.list(&admin(), PeopleQuery::default()).await.unwrap();
    }
}
