//! Tenant and role based authorization rules.

use chrono::{DateTime, Utc};

use crate::domain::entities::{Appointment, CancellationPolicy, Pet, User};
use crate::domain::value_objects::{Role, StatusAction};

/// The authenticated caller, as carried in the access token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: i64,
    pub role: Role,
    pub business_id: Option<i64>,
}

impl Actor {
    pub fn new(user_id: i64, role: Role, business_id: Option<i64>) -> Self {
        Self {
            user_id,
            role,
            business_id,
        }
    }

    pub fn is_super_admin(&self) -> bool {
        self.role == Role::SuperAdmin
    }

    /// Business filter for list queries: `None` means every tenant.
    ///
    /// A non-super-admin without a tenant gets a filter that matches nothing.
    pub fn tenant_scope(&self) -> Option<i64> {
        if self.is_super_admin() {
            None
        } else {
            Some(self.business_id.unwrap_or(-1))
        }
    }
}

/// Domain service deciding who may read or change what.
pub struct AccessPolicy;

impl AccessPolicy {
    /// Super admins see every tenant; everyone else only their own.
    pub fn can_access_business(actor: &Actor, business_id: i64) -> bool {
        actor.is_super_admin() || actor.business_id == Some(business_id)
    }

    /// Admins and staff of the business (or a super admin).
    pub fn is_business_operator(actor: &Actor, business_id: i64) -> bool {
        actor.is_super_admin() || (actor.role.is_business_member() && actor.business_id == Some(business_id))
    }

    /// Business admin of this business (or a super admin).
    pub fn can_manage_business(actor: &Actor, business_id: i64) -> bool {
        actor.is_super_admin() || (actor.role == Role::BusinessAdmin && actor.business_id == Some(business_id))
    }

    pub fn can_view_appointment(actor: &Actor, appointment: &Appointment) -> bool {
        if !Self::can_access_business(actor, appointment.business_id) {
            return false;
        }
        actor.role != Role::Client || appointment.client_id == actor.user_id
    }

    /// Editing details (time, staff, price) is an operator task.
    pub fn can_edit_appointment(actor: &Actor, appointment: &Appointment) -> bool {
        Self::is_business_operator(actor, appointment.business_id)
    }

    /// Whether the actor may apply `action` to the appointment at `now`.
    ///
    /// Operators may apply any action. A client may only cancel their own
    /// appointment, and only while it is at least `hours_before` hours away.
    pub fn can_update_status(
        actor: &Actor,
        appointment: &Appointment,
        action: StatusAction,
        policy: &CancellationPolicy,
        now: DateTime<Utc>,
    ) -> bool {
        if Self::is_business_operator(actor, appointment.business_id) {
            return true;
        }

        actor.role == Role::Client
            && actor.business_id == Some(appointment.business_id)
            && appointment.client_id == actor.user_id
            && action == StatusAction::Cancel
            && appointment.hours_until_start(now) >= policy.hours_before
    }

    /// Operators of the pet's business, or the owning client.
    pub fn can_manage_pet(actor: &Actor, pet: &Pet) -> bool {
        if Self::is_business_operator(actor, pet.business_id) {
            return true;
        }
        actor.role == Role::Client && actor.business_id == Some(pet.business_id) && pet.owner_id == actor.user_id
    }

    /// Operators of the client's business, or the client themself.
    pub fn can_view_client(actor: &Actor, client: &User) -> bool {
        if client.role != Role::Client {
            return false;
        }
        match client.business_id {
            Some(business_id) if Self::is_business_operator(actor, business_id) => true,
            _ => actor.user_id == client.id,
        }
    }
}
