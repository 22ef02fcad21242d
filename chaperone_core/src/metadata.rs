use serde::{Deserialize, Serialize};

use crate::state::GuideAccount;

/// Off-chain JSON document describing a verification token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NftMetadata {
    pub name: String,
    pub description: String,
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_url: Option<String>,
    pub attributes: Vec<NftAttribute>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NftAttribute {
    pub trait_type: String,
    pub value: String,
}

impl NftAttribute {
    fn new(trait_type: &str, value: impl Into<String>) -> Self {
        Self {
            trait_type: trait_type.to_string(),
            value: value.into(),
        }
    }
}

impl NftMetadata {
    /// Metadata for an approved guide; mirrors only public attributes.
    pub fn for_guide(guide: &GuideAccount, profile_url: Option<String>) -> Self {
        let mut attributes = vec![
            NftAttribute::new("License Number", guide.ic_number.as_str()),
            NftAttribute::new("Verification Status", "Verified"),
            NftAttribute::new("Affiliation Type", guide.affiliation_type.as_str()),
        ];
        if let Some(agency) = &guide.agency_name {
            attributes.push(NftAttribute::new("Agency", agency.as_str()));
        }
        Self {
            name: format!("Verified Tour Guide: {}", guide.name),
            description: format!(
                "ChaperoneMe verification for {}, issued to wallet {}",
                guide.name, guide.wallet_address
            ),
            image: guide.photo_id_uri.clone(),
            external_url: profile_url,
            attributes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::VerificationStatus;
    use crate::state::tests::sample_guide;

    #[test]
    fn guide_metadata_carries_public_attributes() {
        let guide = sample_guide(VerificationStatus::Approved);
        let metadata = NftMetadata::for_guide(&guide, None);

        assert_eq!(metadata.name, "Verified Tour Guide: Aisyah Rahman");
        assert_eq!(metadata.image, guide.photo_id_uri);
        let traits: Vec<_> = metadata.attributes.iter().map(|a| a.trait_type.as_str()).collect();
        assert_eq!(
            traits,
            ["License Number", "Verification Status", "Affiliation Type", "Agency"]
        );

        let json = serde_json::to_value(&metadata).unwrap();
        assert!(json.get("external_url").is_none());
        assert_eq!(json["attributes"][2]["value"], "agency");
        assert!(!json.to_string().contains(&guide.email));
    }
}
