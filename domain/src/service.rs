use std::sync::atomic::{AtomicU64, Ordering};

use crate::validate::MAX_IDENTIFIER;
use crate::{
    Clock, Company, CompanyFields, CompanyFilter, CompanyPatch, CompanyRepository, CoreError,
    Ein, NewOwner, Owner, OwnerFilter, OwnerPatch, OwnerRepository, Ssn,
};

/// Application service for company records.
///
/// Generic over repository and clock; the service owns timestamping so the
/// repository stays a plain keyed store.
pub struct CompanyService<R: CompanyRepository, C: Clock> {
    repo: R,
    clock: C,
}

impl<R: CompanyRepository, C: Clock> CompanyService<R, C> {
    pub fn new(repo: R, clock: C) -> Self {
        Self { repo, clock }
    }

    /// Create a company; fails with `Conflict` if the EIN is taken.
    pub fn create(&self, fields: CompanyFields) -> Result<Company, CoreError> {
        self.repo.insert(Company::new(fields, self.clock.now()))
    }

    pub fn get(&self, ein: &Ein) -> Result<Company, CoreError> {
        self.repo.get(ein)
    }

    /// Replace every client field of an existing company. The body's EIN
    /// must name the same record as `ein`.
    pub fn replace(&self, ein: &Ein, fields: CompanyFields) -> Result<Company, CoreError> {
        if fields.ein != *ein {
            return Err(CoreError::InvalidInput(format!(
                "ein {} in body does not match path ein {}",
                fields.ein, ein
            )));
        }
        let now = self.clock.now();
        let mut fields = Some(fields);
        self.repo.update(ein, &mut |company: &mut Company| {
            if let Some(f) = fields.take() {
                company.replace_with(f, now);
            }
        })
    }

    /// Apply a partial update to an existing company.
    pub fn update(&self, ein: &Ein, patch: CompanyPatch) -> Result<Company, CoreError> {
        let now = self.clock.now();
        let mut patch = Some(patch);
        self.repo.update(ein, &mut |company: &mut Company| {
            if let Some(p) = patch.take() {
                company.apply_patch(p, now);
            }
        })
    }

    pub fn delete(&self, ein: &Ein) -> Result<(), CoreError> {
        self.repo.delete(ein).map(|_| ())
    }

    pub fn list(&self, filter: &CompanyFilter) -> Result<Vec<Company>, CoreError> {
        self.repo.list(filter)
    }
}

/// Application service for owner records.
///
/// Owners may arrive with a client-chosen SSN (rejected with `Conflict` when
/// taken) or without one, in which case the service allocates the next free
/// key from an internal monotonically increasing counter.
pub struct OwnerService<R: OwnerRepository, C: Clock> {
    repo: R,
    clock: C,
    next_id: AtomicU64,
}

impl<R: OwnerRepository, C: Clock> OwnerService<R, C> {
    pub fn new(repo: R, clock: C) -> Self {
        Self {
            repo,
            clock,
            next_id: AtomicU64::new(1),
        }
    }

    fn reserve_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Create a new owner.
    pub fn create(&self, input: NewOwner) -> Result<Owner, CoreError> {
        let now = self.clock.now();
        if let Some(ssn) = input.ssn {
            return self.repo.insert(Owner::new(ssn, input, now));
        }

        // Taken keys surface as Conflict from the insert itself; skip them.
        loop {
            let id = self.reserve_id();
            if id > MAX_IDENTIFIER {
                return Err(CoreError::Repository("ssn space exhausted".into()));
            }
            let ssn = Ssn::new(id)?;
            match self.repo.insert(Owner::new(ssn, input.clone(), now)) {
                Err(CoreError::Conflict { .. }) => continue,
                other => return other,
            }
        }
    }

    pub fn get(&self, ssn: &Ssn) -> Result<Owner, CoreError> {
        self.repo.get(ssn)
    }

    /// Replace every client field of an existing owner. A supplied SSN must
    /// match `ssn`.
    pub fn replace(&self, ssn: &Ssn, input: NewOwner) -> Result<Owner, CoreError> {
        if let Some(body_ssn) = input.ssn {
            if body_ssn != *ssn {
                return Err(CoreError::InvalidInput(format!(
                    "ssn {} in body does not match path ssn {}",
                    body_ssn, ssn
                )));
            }
        }
        let now = self.clock.now();
        let mut input = Some(input);
        self.repo.update(ssn, &mut |owner: &mut Owner| {
            if let Some(i) = input.take() {
                owner.replace_with(i, now);
            }
        })
    }

    pub fn update(&self, ssn: &Ssn, patch: OwnerPatch) -> Result<Owner, CoreError> {
        let now = self.clock.now();
        let mut patch = Some(patch);
        self.repo.update(ssn, &mut |owner: &mut Owner| {
            if let Some(p) = patch.take() {
                owner.apply_patch(p, now);
            }
        })
    }

    pub fn delete(&self, ssn: &Ssn) -> Result<(), CoreError> {
        self.repo.delete(ssn).map(|_| ())
    }

    pub fn list(&self, filter: &OwnerFilter) -> Result<Vec<Owner>, CoreError> {
        self.repo.list(filter)
    }
}
