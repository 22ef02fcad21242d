// ---------------------------------------------------------------------------
// PDA derivation helpers
// ---------------------------------------------------------------------------
//
// Must stay byte-identical to the program's `seeds = [...]` constraints or
// every read and write targets the wrong account.

use solana_program::pubkey::Pubkey;

pub const ADMIN_SEED: &[u8] = b"admin";
pub const GUIDE_SEED: &[u8] = b"guide";

/// Singleton admin account: seeds `["admin"]`.
pub fn compute_admin_pda(program_id: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[ADMIN_SEED], program_id)
}

/// Guide record: seeds `["guide", authority, index as u64 little-endian]`.
pub fn compute_guide_pda(program_id: &Pubkey, authority: &Pubkey, index: u64) -> (Pubkey, u8) {
    Pubkey::find_program_address(
        &[GUIDE_SEED, authority.as_ref(), &index.to_le_bytes()],
        program_id,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DEFAULT_PROGRAM_ID;

    #[test]
    fn guide_pda_is_deterministic() {
        let authority = Pubkey::new_unique();
        let first = compute_guide_pda(&DEFAULT_PROGRAM_ID, &authority, 4);
        let second = compute_guide_pda(&DEFAULT_PROGRAM_ID, &authority, 4);
        assert_eq!(first, second);
    }

    #[test]
    fn guide_pda_differs_by_index_and_authority() {
        let authority = Pubkey::new_unique();
        let (a0, _) = compute_guide_pda(&DEFAULT_PROGRAM_ID, &authority, 0);
        let (a1, _) = compute_guide_pda(&DEFAULT_PROGRAM_ID, &authority, 1);
        let (b0, _) = compute_guide_pda(&DEFAULT_PROGRAM_ID, &Pubkey::new_unique(), 0);
        assert_ne!(a0, a1);
        assert_ne!(a0, b0);
    }

    #[test]
    fn bump_recreates_the_address() {
        let authority = Pubkey::new_unique();
        let (guide, bump) = compute_guide_pda(&DEFAULT_PROGRAM_ID, &authority, 9);
        let recreated = Pubkey::create_program_address(
            &[GUIDE_SEED, authority.as_ref(), &9u64.to_le_bytes(), &[bump]],
            &DEFAULT_PROGRAM_ID,
        )
        .unwrap();
        assert_eq!(recreated, guide);

        let (admin, admin_bump) = compute_admin_pda(&DEFAULT_PROGRAM_ID);
        let recreated =
            Pubkey::create_program_address(&[ADMIN_SEED, &[admin_bump]], &DEFAULT_PROGRAM_ID)
                .unwrap();
        assert_eq!(recreated, admin);
    }

    #[test]
    fn pdas_depend_on_program_id() {
        let other = Pubkey::new_unique();
        assert_ne!(compute_admin_pda(&DEFAULT_PROGRAM_ID).0, compute_admin_pda(&other).0);
    }
}
