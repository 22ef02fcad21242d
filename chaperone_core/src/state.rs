// On-chain account layouts of the verification program.
//
// Field order matters: accounts are borsh-encoded behind an 8-byte Anchor
// discriminator, and the program allocates a fixed size, so decoded data is
// usually followed by zero padding.

use std::fmt;

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use solana_program::pubkey::Pubkey;

use crate::error::CoreError;
use crate::guide_id::GuideId;
use crate::instruction::sighash;

// ---------------------------------------------------------------------------
// Variants
// ---------------------------------------------------------------------------

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    BorshSerialize,
    BorshDeserialize,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum VerificationStatus {
    /// Submitted and waiting for the admin
    Pending,
    /// Accepted by the admin; eligible for a verification token
    Approved,
    /// Declined by the admin
    Rejected,
}

impl VerificationStatus {
    /// Only a pending record may move, and only to a final state.
    pub fn can_transition_to(self, next: VerificationStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Approved) | (Self::Pending, Self::Rejected)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    BorshSerialize,
    BorshDeserialize,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum AffiliationType {
    Freelance,
    /// Requires an agency name and an offer letter
    Agency,
}

impl AffiliationType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Freelance => "freelance",
            Self::Agency => "agency",
        }
    }
}

impl fmt::Display for AffiliationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Account decoding
// ---------------------------------------------------------------------------

/// An Anchor account type: discriminator `sha256("account:<Name>")[..8]`
/// followed by the borsh body.
pub trait AccountLayout: BorshSerialize + BorshDeserialize + Sized {
    const NAME: &'static str;

    fn discriminator() -> [u8; 8] {
        sighash("account", Self::NAME)
    }

    fn decode(data: &[u8]) -> Result<Self, CoreError> {
        if data.len() < 8 {
            return Err(CoreError::AccountTooShort(data.len()));
        }
        if data[..8] != Self::discriminator() {
            return Err(CoreError::DiscriminatorMismatch(Self::NAME));
        }
        // Not `borsh::from_slice`: trailing allocation padding is expected.
        let mut body = &data[8..];
        Self::deserialize(&mut body).map_err(|e| CoreError::Decode {
            account: Self::NAME,
            reason: e.to_string(),
        })
    }

    fn encode(&self) -> Result<Vec<u8>, CoreError> {
        let mut data = Self::discriminator().to_vec();
        self.serialize(&mut data)
            .map_err(|e| CoreError::Encode(e.to_string()))?;
        Ok(data)
    }
}

// ---------------------------------------------------------------------------
// Admin singleton
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct AdminAccount {
    /// The admin who can approve/reject verifications
    pub authority: [u8; 32],
    /// Total number of guide accounts created; the next submission's index
    pub guides_count: u64,
}

impl AdminAccount {
    pub fn authority(&self) -> Pubkey {
        Pubkey::new_from_array(self.authority)
    }
}

impl AccountLayout for AdminAccount {
    const NAME: &'static str = "AdminAccount";
}

// ---------------------------------------------------------------------------
// Guide record
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct GuideAccount {
    /// Wallet that submitted the request
    pub authority: [u8; 32],
    pub ic_number: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    /// Wallet that receives the verification token
    pub wallet_address: String,
    pub license_uri: String,
    pub photo_id_uri: String,
    pub attachment_uri: Option<String>,
    pub affiliation_type: AffiliationType,
    pub agency_name: Option<String>,
    pub offer_letter_uri: Option<String>,
    pub status: VerificationStatus,
    /// Unix timestamp set by the program on approval
    pub approved_at: Option<i64>,
    /// Position assigned from `AdminAccount::guides_count`
    pub index: u64,
    pub bump: u8,
}

impl GuideAccount {
    /// Bytes the program allocates per guide record, discriminator included.
    pub const SPACE: usize = 8
        + 32
        + (4 + 20)
        + (4 + 100)
        + (4 + 100)
        + (4 + 20)
        + (4 + 44)
        + (4 + 150)
        + (4 + 150)
        + (1 + 4 + 150)
        + 1
        + (1 + 4 + 100)
        + (1 + 4 + 150)
        + 1
        + (1 + 8)
        + 8
        + 1;

    pub fn authority(&self) -> Pubkey {
        Pubkey::new_from_array(self.authority)
    }

    pub fn id(&self) -> GuideId {
        GuideId::new(self.authority(), self.index)
    }
}

impl AccountLayout for GuideAccount {
    const NAME: &'static str = "GuideAccount";
}

/// A decoded guide account together with its address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuideRecord {
    pub address: Pubkey,
    pub account: GuideAccount,
}

impl GuideRecord {
    pub fn id(&self) -> GuideId {
        self.account.id()
    }

    pub fn status(&self) -> VerificationStatus {
        self.account.status
    }
}
