//! Pet Repository Implementation
//!
//! PostgreSQL implementation of the PetRepository trait over the `pets`
//! and `pet_medical_records` tables.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{PgExecutor, PgPool};

use crate::domain::{MedicalRecord, Pet, PetFilter, PetGender, PetRepository, RecordType, Species};
use crate::shared::error::AppError;
use crate::shared::pagination::PageRequest;
use super::contains_pattern;

const PET_COLUMNS: &str = "id, business_id, owner_id, name, species, breed, date_of_birth, weight_kg, gender, \
     notes, is_active, created_at, updated_at";

const RECORD_COLUMNS: &str =
    "id, pet_id, record_type, title, description, date, veterinarian, next_due_date, created_by, created_at";

/// `$1` business, `$2` owner, `$3` species, `$4` include inactive, `$5` search.
const LIST_FILTER: &str = r#"
    ($1::BIGINT IS NULL OR business_id = $1)
    AND ($2::BIGINT IS NULL OR owner_id = $2)
    AND ($3::VARCHAR IS NULL OR species = $3)
    AND ($4 OR is_active)
    AND ($5::TEXT IS NULL OR name ILIKE $5 ESCAPE '\' OR breed ILIKE $5 ESCAPE '\')
"#;

#[derive(Debug, sqlx::FromRow)]
struct PetRow {
    id: i64,
    business_id: i64,
    owner_id: i64,
    name: String,
    species: String,
    breed: Option<String>,
    date_of_birth: Option<NaiveDate>,
    weight_kg: Option<f64>,
    gender: String,
    notes: Option<String>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl PetRow {
    fn into_pet(self) -> Result<Pet, AppError> {
        let species = Species::parse(&self.species)
            .ok_or_else(|| AppError::Internal(format!("Unknown species '{}'", self.species)))?;

        Ok(Pet {
            id: self.id,
            business_id: self.business_id,
            owner_id: self.owner_id,
            name: self.name,
            species,
            breed: self.breed,
            date_of_birth: self.date_of_birth,
            weight_kg: self.weight_kg,
            gender: PetGender::parse(&self.gender),
            notes: self.notes,
            is_active: self.is_active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct MedicalRecordRow {
    id: i64,
    pet_id: i64,
    record_type: String,
    title: String,
    description: Option<String>,
    date: NaiveDate,
    veterinarian: Option<String>,
    next_due_date: Option<NaiveDate>,
    created_by: i64,
    created_at: DateTime<Utc>,
}

impl MedicalRecordRow {
    fn into_record(self) -> MedicalRecord {
        MedicalRecord {
            id: self.id,
            pet_id: self.pet_id,
            // Constrained on write; unknown values read back as checkups.
            record_type: RecordType::parse(&self.record_type).unwrap_or(RecordType::Checkup),
            title: self.title,
            description: self.description,
            date: self.date,
            veterinarian: self.veterinarian,
            next_due_date: self.next_due_date,
            created_by: self.created_by,
            created_at: self.created_at,
        }
    }
}

/// Insert a pet with any executor (pool or open transaction).
pub(super) async fn insert_pet<'e, E>(executor: E, pet: &Pet) -> Result<Pet, AppError>
where
    E: PgExecutor<'e>,
{
    let sql = format!(
        r#"
        INSERT INTO pets (id, business_id, owner_id, name, species, breed, date_of_birth,
                          weight_kg, gender, notes, is_active)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        RETURNING {PET_COLUMNS}
        "#
    );

    let row = sqlx::query_as::<_, PetRow>(&sql)
        .bind(pet.id)
        .bind(pet.business_id)
        .bind(pet.owner_id)
        .bind(&pet.name)
        .bind(pet.species.as_str())
        .bind(&pet.breed)
        .bind(pet.date_of_birth)
        .bind(pet.weight_kg)
        .bind(pet.gender.as_str())
        .bind(&pet.notes)
        .bind(pet.is_active)
        .fetch_one(executor)
        .await?;

    row.into_pet()
}

/// PostgreSQL pet repository implementation.
#[derive(Clone)]
pub struct PgPetRepository {
    pool: PgPool,
}

impl PgPetRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PetRepository for PgPetRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<Pet>, AppError> {
        let sql = format!("SELECT {PET_COLUMNS} FROM pets WHERE id = $1");
        let row = sqlx::query_as::<_, PetRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(PetRow::into_pet).transpose()
    }

    async fn find_by_owner(&self, owner_id: i64) -> Result<Vec<Pet>, AppError> {
        let sql = format!("SELECT {PET_COLUMNS} FROM pets WHERE owner_id = $1 AND is_active ORDER BY name");
        let rows = sqlx::query_as::<_, PetRow>(&sql)
            .bind(owner_id)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(PetRow::into_pet).collect()
    }

    async fn list(&self, filter: &PetFilter, page: PageRequest) -> Result<(Vec<Pet>, i64), AppError> {
        let species = filter.species.map(|s| s.as_str());

        let sql = format!("SELECT {PET_COLUMNS} FROM pets WHERE {LIST_FILTER} ORDER BY name, id LIMIT $6 OFFSET $7");
        let rows = sqlx::query_as::<_, PetRow>(&sql)
            .bind(filter.business_id)
            .bind(filter.owner_id)
            .bind(species)
            .bind(filter.include_inactive)
            .bind(contains_pattern(filter.search.as_deref()))
            .bind(page.limit)
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;

        let total = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM pets WHERE {LIST_FILTER}"))
            .bind(filter.business_id)
            .bind(filter.owner_id)
            .bind(species)
            .bind(filter.include_inactive)
            .bind(contains_pattern(filter.search.as_deref()))
            .fetch_one(&self.pool)
            .await?;

        let pets = rows.into_iter().map(PetRow::into_pet).collect::<Result<Vec<_>, _>>()?;
        Ok((pets, total))
    }

    async fn create(&self, pet: &Pet) -> Result<Pet, AppError> {
        insert_pet(&self.pool, pet).await
    }

    async fn update(&self, pet: &Pet) -> Result<Pet, AppError> {
        let sql = format!(
            r#"
            UPDATE pets
            SET name = $2, species = $3, breed = $4, date_of_birth = $5,
                weight_kg = $6, gender = $7, notes = $8, updated_at = NOW()
            WHERE id = $1
            RETURNING {PET_COLUMNS}
            "#
        );

        let row = sqlx::query_as::<_, PetRow>(&sql)
            .bind(pet.id)
            .bind(&pet.name)
            .bind(pet.species.as_str())
            .bind(&pet.breed)
            .bind(pet.date_of_birth)
            .bind(pet.weight_kg)
            .bind(pet.gender.as_str())
            .bind(&pet.notes)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Pet with id {} not found", pet.id)))?;

        row.into_pet()
    }

    async fn deactivate(&self, id: i64) -> Result<(), AppError> {
        let result = sqlx::query("UPDATE pets SET is_active = FALSE, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Pet with id {} not found", id)));
        }
        Ok(())
    }

    async fn count_active(&self, business_id: Option<i64>) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM pets WHERE ($1::BIGINT IS NULL OR business_id = $1) AND is_active",
        )
        .bind(business_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn add_medical_record(&self, record: &MedicalRecord) -> Result<MedicalRecord, AppError> {
        let sql = format!(
            r#"
            INSERT INTO pet_medical_records (id, pet_id, record_type, title, description, date,
                                             veterinarian, next_due_date, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {RECORD_COLUMNS}
            "#
        );

        let row = sqlx::query_as::<_, MedicalRecordRow>(&sql)
            .bind(record.id)
            .bind(record.pet_id)
            .bind(record.record_type.as_str())
            .bind(&record.title)
            .bind(&record.description)
            .bind(record.date)
            .bind(&record.veterinarian)
            .bind(record.next_due_date)
            .bind(record.created_by)
            .fetch_one(&self.pool)
            .await?;

        Ok(row.into_record())
    }

    async fn list_medical_records(&self, pet_id: i64) -> Result<Vec<MedicalRecord>, AppError> {
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM pet_medical_records WHERE pet_id = $1 ORDER BY date DESC, id DESC"
        );
        let rows = sqlx::query_as::<_, MedicalRecordRow>(&sql)
            .bind(pet_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(MedicalRecordRow::into_record).collect())
    }

    /// A vaccination on or before `on` that is not yet due again.
    async fn has_current_vaccination(&self, pet_id: i64, on: NaiveDate) -> Result<bool, AppError> {
        let current = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM pet_medical_records
                WHERE pet_id = $1
                  AND record_type = 'vaccination'
                  AND date <= $2
                  AND (next_due_date IS NULL OR next_due_date >= $2)
            )
            "#,
        )
        .bind(pet_id)
        .bind(on)
        .fetch_one(&self.pool)
        .await?;

        Ok(current)
    }
}
