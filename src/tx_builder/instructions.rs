use super::BuildError;
use crate::models::{RawInstruction, RawInstructionSet};

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use solana_sdk::instruction::{AccountMeta, Instruction};
use solana_sdk::pubkey::Pubkey;

fn parse_pubkey(value: &str) -> Result<Pubkey, BuildError> {
    value.parse().map_err(|source| BuildError::InvalidPubkey {
        value: value.to_string(),
        source,
    })
}

pub fn deserialize_instruction(raw: &RawInstruction) -> Result<Instruction, BuildError> {
    let accounts = raw
        .accounts
        .iter()
        .map(|meta| {
            Ok(AccountMeta {
                pubkey: parse_pubkey(&meta.pubkey)?,
                is_signer: meta.is_signer,
                is_writable: meta.is_writable,
            })
        })
        .collect::<Result<Vec<_>, BuildError>>()?;
    Ok(Instruction {
        program_id: parse_pubkey(&raw.program_id)?,
        accounts,
        data: BASE64_STANDARD.decode(&raw.data)?,
    })
}

/// The aggregator's instructions in execution order: setup, swap, then cleanup.
pub fn ordered_instructions(set: &RawInstructionSet) -> Result<Vec<Instruction>, BuildError> {
    set.setup_instructions
        .iter()
        .chain(std::iter::once(&set.swap_instruction))
        .chain(set.cleanup_instruction.iter())
        .map(deserialize_instruction)
        .collect()
}

pub fn lookup_table_keys(set: &RawInstructionSet) -> Result<Vec<Pubkey>, BuildError> {
    set.address_lookup_table_addresses
        .iter()
        .map(|key| parse_pubkey(key))
        .collect()
}
