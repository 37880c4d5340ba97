//! Client Service
//!
//! Clients are users with the `client` role inside a business. The client
//! wizard creates the account and its pets in one transaction.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use rand::distr::Alphanumeric;
use rand::Rng;

use crate::application::dto::request::{CreateClientRequest, PageQuery, PeopleQuery, UpdateClientRequest};
use crate::application::services::auth_service::hash_password;
use crate::application::services::pet_service::pet_from_input;
use crate::domain::services::{AccessPolicy, Actor};
use crate::domain::{
    normalize_email, AppointmentDetails, AppointmentFilter, AppointmentRepository, Pet, PetRepository, Role, User,
    UserFilter, UserRepository,
};
use crate::shared::error::AppError;
use crate::shared::pagination::{Page, PageRequest};
use crate::shared::snowflake::SnowflakeGenerator;

#[async_trait]
pub trait ClientService: Send + Sync {
    /// Client wizard: profile, address and pets.
    async fn create(&self, actor: &Actor, request: CreateClientRequest) -> Result<(User, Vec<Pet>), ClientError>;

    async fn list(&self, actor: &Actor, query: PeopleQuery) -> Result<Page<User>, ClientError>;

    /// Client with their active pets.
    async fn get(&self, actor: &Actor, id: i64) -> Result<(User, Vec<Pet>), ClientError>;

    async fn update(&self, actor: &Actor, id: i64, request: UpdateClientRequest) -> Result<User, ClientError>;

    async fn deactivate(&self, actor: &Actor, id: i64) -> Result<(), ClientError>;

    async fn appointments(
        &self,
        actor: &Actor,
        id: i64,
        query: PageQuery,
    ) -> Result<Page<AppointmentDetails>, ClientError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Client not found")]
    NotFound,

    #[error("Email already registered")]
    EmailExists,

    #[error("Only business staff can manage clients")]
    Forbidden,

    #[error(transparent)]
    App(#[from] AppError),
}

impl From<ClientError> for AppError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::NotFound => AppError::NotFound(err.to_string()),
            ClientError::EmailExists => AppError::Conflict(err.to_string()),
            ClientError::Forbidden => AppError::Forbidden(err.to_string()),
            ClientError::App(e) => e,
        }
    }
}

/// Password for accounts created on a client's behalf; they reset it via OTP.
fn random_password() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(24)
        .map(char::from)
        .collect()
}

pub struct ClientServiceImpl<U, P, A>
where
    U: UserRepository,
    P: PetRepository,
    A: AppointmentRepository,
{
    user_repo: Arc<U>,
    pet_repo: Arc<P>,
    appointment_repo: Arc<A>,
    id_generator: Arc<SnowflakeGenerator>,
}

impl<U, P, A> ClientServiceImpl<U, P, A>
where
    U: UserRepository,
    P: PetRepository,
    A: AppointmentRepository,
{
    pub fn new(
        user_repo: Arc<U>,
        pet_repo: Arc<P>,
        appointment_repo: Arc<A>,
        id_generator: Arc<SnowflakeGenerator>,
    ) -> Self {
        Self {
            user_repo,
            pet_repo,
            appointment_repo,
            id_generator,
        }
    }

    fn operator_business(actor: &Actor) -> Result<i64, ClientError> {
        actor
            .business_id
            .filter(|id| AccessPolicy::is_business_operator(actor, *id))
            .ok_or(ClientError::Forbidden)
    }

    async fn load_client(&self, actor: &Actor, id: i64) -> Result<User, ClientError> {
        let client = self
            .user_repo
            .find_by_id(id)
            .await?
            .filter(|u| u.role == Role::Client)
            .filter(|u| u.business_id.is_some_and(|b| AccessPolicy::can_access_business(actor, b)))
            .ok_or(ClientError::NotFound)?;

        if !AccessPolicy::can_view_client(actor, &client) {
            return Err(ClientError::Forbidden);
        }
        Ok(client)
    }

    fn is_operator_of(actor: &Actor, client: &User) -> bool {
        client
            .business_id
            .is_some_and(|b| AccessPolicy::is_business_operator(actor, b))
    }
}

#[async_trait]
impl<U, P, A> ClientService for ClientServiceImpl<U, P, A>
where
    U: UserRepository + 'static,
    P: PetRepository + 'static,
    A: AppointmentRepository + 'static,
{
    async fn create(&self, actor: &Actor, request: CreateClientRequest) -> Result<(User, Vec<Pet>), ClientError> {
        let business_id = Self::operator_business(actor)?;
        let profile = request.profile;

        let email = normalize_email(&profile.email);
        if self.user_repo.email_exists(&email).await? {
            return Err(ClientError::EmailExists);
        }

        let password = profile.password.unwrap_or_else(random_password);
        let password_hash = hash_password(&password).map_err(AppError::from)?;
        let now = Utc::now();

        let user = User {
            id: self.id_generator.generate(),
            business_id: Some(business_id),
            role: Role::Client,
            first_name: profile.first_name.trim().to_string(),
            last_name: profile.last_name.trim().to_string(),
            email,
            phone: profile.phone.filter(|p| !p.trim().is_empty()),
            password_hash,
            address: request.address,
            created_at: now,
            updated_at: now,
            ..Default::default()
        };

        let pets = request
            .pets
            .into_iter()
            .map(|input| pet_from_input(self.id_generator.generate(), &user, business_id, input))
            .collect::<Result<Vec<_>, _>>()?;

        let (user, pets) = self.user_repo.create_with_pets(&user, &pets).await?;
        tracing::info!(
            client_id = user.id,
            business_id,
            pets = pets.len(),
            created_by = actor.user_id,
            "Client created"
        );

        Ok((user, pets))
    }

    async fn list(&self, actor: &Actor, query: PeopleQuery) -> Result<Page<User>, ClientError> {
        if !actor.is_super_admin() {
            Self::operator_business(actor)?;
        }

        let filter = UserFilter {
            business_id: actor.tenant_scope(),
            role: Some(Role::Client),
            is_active: query.is_active,
            search: query.search.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()),
        };
        let page = PageRequest::new(query.page, query.limit);

        let (clients, total) = self.user_repo.list(&filter, page).await?;
        Ok(Page::new(clients, page, total))
    }

    async fn get(&self, actor: &Actor, id: i64) -> Result<(User, Vec<Pet>), ClientError> {
        let client = self.load_client(actor, id).await?;
        let pets = self.pet_repo.find_by_owner(client.id).await?;
        Ok((client, pets))
    }

    async fn update(&self, actor: &Actor, id: i64, request: UpdateClientRequest) -> Result<User, ClientError> {
        let mut client = self.load_client(actor, id).await?;

        if let Some(is_active) = request.is_active {
            if !Self::is_operator_of(actor, &client) {
                return Err(ClientError::Forbidden);
            }
            client.is_active = is_active;
        }
        if let Some(first_name) = request.first_name {
            client.first_name = first_name.trim().to_string();
        }
        if let Some(last_name) = request.last_name {
            client.last_name = last_name.trim().to_string();
        }
        if let Some(phone) = request.phone {
            client.phone = Some(phone).filter(|p| !p.trim().is_empty());
        }
        if let Some(address) = request.address {
            client.address = address;
        }
        client.updated_at = Utc::now();

        let client = self.user_repo.update(&client).await?;
        tracing::info!(client_id = id, "Client updated");
        Ok(client)
    }

    async fn deactivate(&self, actor: &Actor, id: i64) -> Result<(), ClientError> {
        let mut client = self.load_client(actor, id).await?;
        if !Self::is_operator_of(actor, &client) {
            return Err(ClientError::Forbidden);
        }

        client.is_active = false;
        client.updated_at = Utc::now();
        self.user_repo.update(&client).await?;

        tracing::info!(client_id = id, deactivated_by = actor.user_id, "Client deactivated");
        Ok(())
    }

    async fn appointments(
        &self,
        actor: &Actor,
        id: i64,
        query: PageQuery,
    ) -> Result<Page<AppointmentDetails>, ClientError> {
        let client = self.load_client(actor, id).await?;

        let filter = AppointmentFilter {
            business_id: client.business_id,
            client_id: Some(client.id),
            ..Default::default()
        };
        let page = PageRequest::new(query.page, query.limit);

        let (appointments, total) = self.appointment_repo.list(&filter, page).await?;
        Ok(Page::new(appointments, page, total))
    }
}
