//! Pet Service
//!
//! Pet CRUD scoped to a business, plus the medical history.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use crate::application::dto::request::{
    CreateMedicalRecordRequest, CreatePetRequest, PetInput, PetQuery, UpdatePetRequest,
};
use crate::domain::services::{AccessPolicy, Actor};
use crate::domain::{
    MedicalRecord, Pet, PetFilter, PetGender, PetRepository, RecordType, Role, Species, User, UserRepository,
};
use crate::shared::error::AppError;
use crate::shared::pagination::{Page, PageRequest};
use crate::shared::snowflake::SnowflakeGenerator;
use crate::shared::validation::{field_error, optional_id, parse_date, require_id};

#[async_trait]
pub trait PetService: Send + Sync {
    async fn create(&self, actor: &Actor, request: CreatePetRequest) -> Result<Pet, PetError>;

    async fn list(&self, actor: &Actor, query: PetQuery) -> Result<Page<Pet>, PetError>;

    async fn get(&self, actor: &Actor, id: i64) -> Result<Pet, PetError>;

    async fn update(&self, actor: &Actor, id: i64, request: UpdatePetRequest) -> Result<Pet, PetError>;

    /// Soft delete.
    async fn delete(&self, actor: &Actor, id: i64) -> Result<(), PetError>;

    async fn add_medical_record(
        &self,
        actor: &Actor,
        pet_id: i64,
        request: CreateMedicalRecordRequest,
    ) -> Result<MedicalRecord, PetError>;

    async fn list_medical_records(&self, actor: &Actor, pet_id: i64) -> Result<Vec<MedicalRecord>, PetError>;
}

#[derive(Debug, thiserror::Error)]
pub enum PetError {
    #[error("Pet not found")]
    NotFound,

    #[error("Owner not found")]
    OwnerNotFound,

    #[error("You do not have permission to manage this pet")]
    Forbidden,

    #[error(transparent)]
    App(#[from] AppError),
}

impl From<PetError> for AppError {
    fn from(err: PetError) -> Self {
        match err {
            PetError::NotFound | PetError::OwnerNotFound => AppError::NotFound(err.to_string()),
            PetError::Forbidden => AppError::Forbidden(err.to_string()),
            PetError::App(e) => e,
        }
    }
}

fn trimmed(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parse_species(value: &str) -> Result<Species, AppError> {
    Species::parse(value.trim()).ok_or_else(|| field_error("species", "Invalid species"))
}

/// Build a new pet for `owner` from form input.
pub(crate) fn pet_from_input(id: i64, owner: &User, business_id: i64, input: PetInput) -> Result<Pet, AppError> {
    let date_of_birth = trimmed(input.date_of_birth)
        .map(|d| parse_date("date_of_birth", &d))
        .transpose()?;
    let species = trimmed(input.species)
        .map(|s| parse_species(&s))
        .transpose()?
        .unwrap_or_default();
    let now = Utc::now();

    Ok(Pet {
        id,
        business_id,
        owner_id: owner.id,
        name: input.name.trim().to_string(),
        species,
        breed: trimmed(input.breed),
        date_of_birth,
        weight_kg: input.weight_kg,
        gender: input.gender.as_deref().map(PetGender::parse).unwrap_or_default(),
        notes: trimmed(input.notes),
        is_active: true,
        created_at: now,
        updated_at: now,
    })
}

pub struct PetServiceImpl<P, U>
where
    P: PetRepository,
    U: UserRepository,
{
    pet_repo: Arc<P>,
    user_repo: Arc<U>,
    id_generator: Arc<SnowflakeGenerator>,
}

impl<P, U> PetServiceImpl<P, U>
where
    P: PetRepository,
    U: UserRepository,
{
    pub fn new(pet_repo: Arc<P>, user_repo: Arc<U>, id_generator: Arc<SnowflakeGenerator>) -> Self {
        Self {
            pet_repo,
            user_repo,
            id_generator,
        }
    }

    /// Load a pet the actor may manage; other tenants' pets look missing.
    async fn load_managed(&self, actor: &Actor, id: i64) -> Result<Pet, PetError> {
        let pet = self
            .pet_repo
            .find_by_id(id)
            .await?
            .filter(|p| AccessPolicy::can_access_business(actor, p.business_id))
            .ok_or(PetError::NotFound)?;

        if !AccessPolicy::can_manage_pet(actor, &pet) {
            return Err(PetError::Forbidden);
        }
        Ok(pet)
    }
}

#[async_trait]
impl<P, U> PetService for PetServiceImpl<P, U>
where
    P: PetRepository + 'static,
    U: UserRepository + 'static,
{
    async fn create(&self, actor: &Actor, request: CreatePetRequest) -> Result<Pet, PetError> {
        let owner_id = if actor.role == Role::Client {
            actor.user_id
        } else {
            require_id("owner_id", request.owner_id.as_deref(), "Please select an owner")?
        };

        let owner = self
            .user_repo
            .find_by_id(owner_id)
            .await?
            .filter(|u| AccessPolicy::can_view_client(actor, u))
            .ok_or(PetError::OwnerNotFound)?;
        let business_id = owner.business_id.ok_or(PetError::OwnerNotFound)?;

        let pet = pet_from_input(self.id_generator.generate(), &owner, business_id, request.pet)?;
        let pet = self.pet_repo.create(&pet).await?;

        tracing::info!(pet_id = pet.id, owner_id, business_id, "Pet created");
        Ok(pet)
    }

    async fn list(&self, actor: &Actor, query: PetQuery) -> Result<Page<Pet>, PetError> {
        let is_client = actor.role == Role::Client;
        let owner_id = if is_client {
            Some(actor.user_id)
        } else {
            optional_id("owner_id", query.owner_id.as_deref())?
        };

        let filter = PetFilter {
            business_id: actor.tenant_scope(),
            owner_id,
            species: query
                .species
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty() && *s != "all")
                .map(parse_species)
                .transpose()?,
            include_inactive: !is_client && query.include_inactive.unwrap_or(false),
            search: trimmed(query.search),
        };
        let page = PageRequest::new(query.page, query.limit);

        let (pets, total) = self.pet_repo.list(&filter, page).await?;
        Ok(Page::new(pets, page, total))
    }

    async fn get(&self, actor: &Actor, id: i64) -> Result<Pet, PetError> {
        self.load_managed(actor, id).await
    }

    async fn update(&self, actor: &Actor, id: i64, request: UpdatePetRequest) -> Result<Pet, PetError> {
        let mut pet = self.load_managed(actor, id).await?;

        if let Some(name) = request.name {
            pet.name = name.trim().to_string();
        }
        if let Some(species) = request.species {
            pet.species = parse_species(&species)?;
        }
        if let Some(breed) = request.breed {
            pet.breed = trimmed(Some(breed));
        }
        if let Some(dob) = request.date_of_birth {
            pet.date_of_birth = trimmed(Some(dob))
                .map(|d| parse_date("date_of_birth", &d))
                .transpose()?;
        }
        if let Some(weight) = request.weight_kg {
            pet.weight_kg = Some(weight);
        }
        if let Some(gender) = request.gender {
            pet.gender = PetGender::parse(&gender);
        }
        if let Some(notes) = request.notes {
            pet.notes = trimmed(Some(notes));
        }
        pet.updated_at = Utc::now();

        let pet = self.pet_repo.update(&pet).await?;
        tracing::info!(pet_id = id, "Pet updated");
        Ok(pet)
    }

    async fn delete(&self, actor: &Actor, id: i64) -> Result<(), PetError> {
        self.load_managed(actor, id).await?;
        self.pet_repo.deactivate(id).await?;

        tracing::info!(pet_id = id, "Pet deactivated");
        Ok(())
    }

    async fn add_medical_record(
        &self,
        actor: &Actor,
        pet_id: i64,
        request: CreateMedicalRecordRequest,
    ) -> Result<MedicalRecord, PetError> {
        self.load_managed(actor, pet_id).await?;

        let record_type = RecordType::parse(&request.record_type)
            .ok_or_else(|| field_error("record_type", "Invalid record type"))?;
        let date = parse_date("date", &request.date)?;
        let next_due_date = trimmed(request.next_due_date)
            .map(|d| parse_date("next_due_date", &d))
            .transpose()?;
        if next_due_date.is_some_and(|due| due < date) {
            return Err(field_error("next_due_date", "Next due date cannot be before the record date").into());
        }

        let record = MedicalRecord {
            id: self.id_generator.generate(),
            pet_id,
            record_type,
            title: request.title.trim().to_string(),
            description: trimmed(request.description),
            date,
            veterinarian: trimmed(request.veterinarian),
            next_due_date,
            created_by: actor.user_id,
            created_at: Utc::now(),
        };

        let record = self.pet_repo.add_medical_record(&record).await?;
        tracing::info!(pet_id, record_id = record.id, record_type = record_type.as_str(), "Medical record added");
        Ok(record)
    }

    async fn list_medical_records(&self, actor: &Actor, pet_id: i64) -> Result<Vec<MedicalRecord>, PetError> {
        self.load_managed(actor, pet_id).await?;
        Ok(self.pet_repo.list_medical_records(pet_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MockPetRepository, MockUserRepository};
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    const BIZ: i64 = 100;
    const OWNER: i64 = 7;

    fn service(pets: MockPetRepository, users: MockUserRepository) -> PetServiceImpl<MockPetRepository, MockUserRepository> {
        PetServiceImpl::new(Arc::new(pets), Arc::new(users), Arc::new(SnowflakeGenerator::new(1, 1)))
    }

    fn staff() -> Actor {
        Actor::new(2, Role::Staff, Some(BIZ))
    }

    fn owner() -> User {
        User {
            id: OWNER,
            role: Role::Client,
            business_id: Some(BIZ),
            ..Default::default()
        }
    }

    fn stored_pet(owner_id: i64, business_id: i64) -> Pet {
        Pet {
            id: 20,
            business_id,
            owner_id,
            name: "Biscuit".into(),
            ..Default::default()
        }
    }

    fn record_request(date: &str, next_due: Option<&str>) -> CreateMedicalRecordRequest {
        CreateMedicalRecordRequest {
            record_type: "vaccination".into(),
            title: "Rabies".into(),
            description: None,
            date: date.into(),
            veterinarian: Some("Dr. Vale".into()),
            next_due_date: next_due.map(String::from),
        }
    }

    #[test]
    fn test_pet_from_input_parses_fields() {
        let input = PetInput {
            name: "  Biscuit ".into(),
            species: Some("Cat".into()),
            breed: Some("".into()),
            date_of_birth: Some("2022-03-15".into()),
            gender: Some("female".into()),
            ..Default::default()
        };

        let pet = pet_from_input(1, &owner(), BIZ, input).unwrap();
        assert_eq!(pet.name, "Biscuit");
        assert_eq!(pet.species, Species::Cat);
        assert_eq!(pet.gender, PetGender::Female);
        assert_eq!(pet.breed, None);
        assert_eq!(pet.date_of_birth, NaiveDate::from_ymd_opt(2022, 3, 15));
        assert_eq!(pet.owner_id, OWNER);
    }

    #[tokio::test]
    async fn test_staff_create_requires_owner() {
        let svc = service(MockPetRepository::new(), MockUserRepository::new());
        let request = CreatePetRequest {
            owner_id: None,
            pet: PetInput {
                name: "Rex".into(),
                ..Default::default()
            },
        };

        match AppError::from(svc.create(&staff(), request).await.unwrap_err()) {
            AppError::InvalidFields(errors) => assert_eq!(errors[0].message, "Please select an owner"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_client_creates_own_pet() {
        let mut users = MockUserRepository::new();
        users.expect_find_by_id().returning(|_| Ok(Some(owner())));
        let mut pets = MockPetRepository::new();
        pets.expect_create()
            .withf(|p| p.owner_id == OWNER && p.business_id == BIZ)
            .returning(|p| Ok(p.clone()));
        let svc = service(pets, users);

        let client = Actor::new(OWNER, Role::Client, Some(BIZ));
        let request = CreatePetRequest {
            owner_id: Some("555".into()),
            pet: PetInput {
                name: "Rex".into(),
                ..Default::default()
            },
        };

        let pet = svc.create(&client, request).await.unwrap();
        assert_eq!(pet.name, "Rex");
    }

    #[tokio::test]
    async fn test_client_cannot_read_another_clients_pet() {
        let mut pets = MockPetRepository::new();
        pets.expect_find_by_id().returning(|_| Ok(Some(stored_pet(99, BIZ))));
        let svc = service(pets, MockUserRepository::new());

        let client = Actor::new(OWNER, Role::Client, Some(BIZ));
        let err = svc.get(&client, 20).await.unwrap_err();
        assert!(matches!(err, PetError::Forbidden));
    }

    #[tokio::test]
    async fn test_other_tenant_pet_is_not_found() {
        let mut pets = MockPetRepository::new();
        pets.expect_find_by_id().returning(|_| Ok(Some(stored_pet(OWNER, 999))));
        pets.expect_deactivate().never();
        let svc = service(pets, MockUserRepository::new());

        let err = svc.delete(&staff(), 20).await.unwrap_err();
        assert!(matches!(err, PetError::NotFound));
    }

    #[tokio::test]
    async fn test_client_list_is_limited_to_own_active_pets() {
        let mut pets = MockPetRepository::new();
        pets.expect_list()
            .withf(|filter, _| {
                filter.owner_id == Some(OWNER)
                    && filter.business_id == Some(BIZ)
                    && !filter.include_inactive
                    && filter.species == Some(Species::Dog)
            })
            .returning(|_, _| Ok((vec![stored_pet(OWNER, BIZ)], 1)));
        let svc = service(pets, MockUserRepository::new());

        let client = Actor::new(OWNER, Role::Client, Some(BIZ));
        let query = PetQuery {
            owner_id: Some("99".into()),
            species: Some("dog".into()),
            include_inactive: Some(true),
            ..Default::default()
        };

        let page = svc.list(&client, query).await.unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.pagination.total, 1);
    }

    fn species_field(err: PetError) -> String {
        match err {
            PetError::App(AppError::InvalidFields(errors)) => errors[0].field.clone(),
            other => panic!("expected field error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_create_rejects_unknown_species() {
        let mut users = MockUserRepository::new();
        users.expect_find_by_id().returning(|_| Ok(Some(owner())));
        let mut pets = MockPetRepository::new();
        pets.expect_create().never();
        let svc = service(pets, users);

        let request = CreatePetRequest {
            owner_id: Some(OWNER.to_string()),
            pet: PetInput {
                name: "Rex".into(),
                species: Some("dgo".into()),
                ..Default::default()
            },
        };

        let err = svc.create(&staff(), request).await.unwrap_err();
        assert_eq!(species_field(err), "species");
    }

    #[tokio::test]
    async fn test_update_rejects_unknown_species() {
        let mut pets = MockPetRepository::new();
        pets.expect_find_by_id().returning(|_| Ok(Some(stored_pet(OWNER, BIZ))));
        pets.expect_update().never();
        let svc = service(pets, MockUserRepository::new());

        let request = UpdatePetRequest {
            species: Some("ferret".into()),
            ..Default::default()
        };

        let err = svc.update(&staff(), 20, request).await.unwrap_err();
        assert_eq!(species_field(err), "species");
    }

    #[tokio::test]
    async fn test_medical_record_due_date_must_follow_date() {
        let mut pets = MockPetRepository::new();
        pets.expect_find_by_id().returning(|_| Ok(Some(stored_pet(OWNER, BIZ))));
        pets.expect_add_medical_record().never();
        let svc = service(pets, MockUserRepository::new());

        let err = svc
            .add_medical_record(&staff(), 20, record_request("2024-05-01", Some("2024-04-01")))
            .await
            .unwrap_err();

        match AppError::from(err) {
            AppError::InvalidFields(errors) => assert_eq!(errors[0].field, "next_due_date"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_medical_record_is_stored_with_author() {
        let mut pets = MockPetRepository::new();
        pets.expect_find_by_id().returning(|_| Ok(Some(stored_pet(OWNER, BIZ))));
        pets.expect_add_medical_record()
            .withf(|r| r.created_by == 2 && r.record_type == RecordType::Vaccination && r.pet_id == 20)
            .returning(|r| Ok(r.clone()));
        let svc = service(pets, MockUserRepository::new());

        let record = svc
            .add_medical_record(&staff(), 20, record_request("2024-05-01", Some("2025-05-01")))
            .await
            .unwrap();
        assert_eq!(record.title, "Rabies");
        assert_eq!(record.next_due_date, NaiveDate::from_ymd_opt(2025, 5, 1));
    }
}
