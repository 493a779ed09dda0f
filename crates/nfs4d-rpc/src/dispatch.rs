use nfs4d_types::{NfsProcedure, NFS_V4, PROGRAM_MOUNT, PROGRAM_NFS};

use crate::error::RpcError;

/// Resolve `(program, version, procedure)` to the accepted
/// [`NfsProcedure`], or the exact error the table in §4.9 calls for.
pub fn resolve_procedure(program: u32, version: u32, procedure: u32) -> Result<NfsProcedure, RpcError> {
    match program {
        PROGRAM_NFS if version != NFS_V4 => Err(RpcError::ProgUnavail(program)),
        PROGRAM_NFS | PROGRAM_MOUNT => NfsProcedure::from_program_and_number(program, procedure)
            .ok_or(RpcError::ProcUnavail(procedure, program)),
        other => Err(RpcError::ProgUnavail(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compound_is_accepted_for_nfs_v4() {
        assert_eq!(
            resolve_procedure(PROGRAM_NFS, NFS_V4, 1).unwrap(),
            NfsProcedure::Compound
        );
    }

    #[test]
    fn unknown_program_is_prog_unavail() {
        assert!(matches!(
            resolve_procedure(999_999, 1, 0),
            Err(RpcError::ProgUnavail(999_999))
        ));
    }

    #[test]
    fn unknown_nfs_procedure_is_proc_unavail() {
        assert!(matches!(
            resolve_procedure(PROGRAM_NFS, NFS_V4, 99),
            Err(RpcError::ProcUnavail(99, PROGRAM_NFS))
        ));
    }

    #[test]
    fn mount_accepts_only_null_and_mnt() {
        assert_eq!(
            resolve_procedure(PROGRAM_MOUNT, 3, 3).unwrap(),
            NfsProcedure::Mnt
        );
        assert!(resolve_procedure(PROGRAM_MOUNT, 3, 7).is_err());
    }
}
