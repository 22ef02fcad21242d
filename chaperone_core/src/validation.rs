// Client-side checks run before any document is uploaded, so that a request
// the program would refuse never consumes pinning quota.

use thiserror::Error;

use crate::state::AffiliationType;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("{field} is {len} bytes, the program stores at most {max}")]
    TooLong {
        field: &'static str,
        len: usize,
        max: usize,
    },
    #[error("missing required document: {0}")]
    MissingDocument(&'static str),
    #[error("agency affiliation requires an agency name")]
    MissingAgencyName,
    #[error("agency affiliation requires an offer letter")]
    MissingOfferLetter,
    /// The program's own check, mirrored for already-uploaded arguments.
    #[error("missing required agency information")]
    MissingAgencyInformation,
}

/// Contact and affiliation fields of a verification request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuideDetails {
    pub ic_number: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub wallet_address: String,
    pub affiliation: AffiliationType,
    pub agency_name: Option<String>,
}

/// Which documents accompany a request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DocumentPresence {
    pub license: bool,
    pub photo_id: bool,
    pub attachment: bool,
    pub offer_letter: bool,
}

pub(crate) fn check_len(
    field: &'static str,
    value: &str,
    max: usize,
) -> Result<(), ValidationError> {
    if value.len() > max {
        return Err(ValidationError::TooLong {
            field,
            len: value.len(),
            max,
        });
    }
    Ok(())
}

fn required(field: &'static str, value: &str, max: usize) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::MissingField(field));
    }
    check_len(field, value, max)
}

impl GuideDetails {
    pub fn validate(&self, documents: DocumentPresence) -> Result<(), ValidationError> {
        required("ic_number", &self.ic_number, 20)?;
        required("name", &self.name, 100)?;
        required("email", &self.email, 100)?;
        required("phone", &self.phone, 20)?;
        required("wallet_address", &self.wallet_address, 44)?;

        if !documents.license {
            return Err(ValidationError::MissingDocument("license"));
        }
        if !documents.photo_id {
            return Err(ValidationError::MissingDocument("photo_id"));
        }

        if self.affiliation == AffiliationType::Agency {
            match self.agency_name.as_deref().map(str::trim) {
                None | Some("") => return Err(ValidationError::MissingAgencyName),
                Some(agency) => check_len("agency_name", agency, 100)?,
            }
            if !documents.offer_letter {
                return Err(ValidationError::MissingOfferLetter);
            }
        }
        Ok(())
    }

    /// Drops agency-only fields from freelance requests.
    pub fn normalized(mut self) -> Self {
        match self.affiliation {
            AffiliationType::Freelance => self.agency_name = None,
            AffiliationType::Agency => {
                self.agency_name = self.agency_name.map(|a| a.trim().to_string());
            }
        }
        self
    }
}
