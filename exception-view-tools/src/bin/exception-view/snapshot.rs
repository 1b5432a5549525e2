//! Target snapshots: the register file, memory and symbols of a halted core, stored as YAML.
//!
//! ```yaml
//! registers:
//!   xPSR: 0x01000003
//!   LR: 0xFFFFFFFD
//!   PSP: 0x20001000
//! memory:
//!   - address: 0x20001000
//!     words: [0, 1, 2, 3, 12, 0x08000121, 0x08000204, 0x01000000]
//!   - address: 0x20004000
//!     text: "boot\r\n"
//! symbols:
//!   - name: uartOutputBuf_s
//!     address: 0x20004000
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::Context;
use exception_view::{CoreRegister, DebugHost, Error};
use serde::Deserialize;

use crate::symbols::{SymbolEntry, SymbolTable};
use crate::util::parse_u32;

/// Errors loading a snapshot.
#[derive(thiserror::Error, docsplay::Display, Debug)]
pub enum SnapshotError {
    /// Opening {1} for reading the snapshot failed.
    Read(#[source] std::io::Error, PathBuf),

    /// Decoding the snapshot YAML failed.
    Decode(#[from] serde_yaml::Error),

    /// The memory block at {0:#010x} must have exactly one of `words`, `bytes` or `text`.
    BlockContents(u32),

    /// The memory block at {0:#010x} is empty.
    EmptyBlock(u32),

    /// The memory block at {address:#010x} overlaps the block at {other:#010x}.
    Overlap { address: u32, other: u32 },
}

/// A 32 bit value, written either as an integer or as a string in any base `parse_int` accepts.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "WordRepr")]
struct Word(u32);

#[derive(Deserialize)]
#[serde(untagged)]
enum WordRepr {
    Int(u32),
    Text(String),
}

impl TryFrom<WordRepr> for Word {
    type Error = String;

    fn try_from(repr: WordRepr) -> Result<Self, Self::Error> {
        match repr {
            WordRepr::Int(value) => Ok(Word(value)),
            WordRepr::Text(text) => parse_u32(&text)
                .map(Word)
                .map_err(|e| format!("'{text}' is not a 32 bit value: {e}")),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct MemoryBlock {
    address: Word,
    words: Option<Vec<Word>>,
    bytes: Option<Vec<u8>>,
    text: Option<String>,
}

impl MemoryBlock {
    fn into_bytes(self) -> Result<(u32, Vec<u8>), SnapshotError> {
        let address = self.address.0;
        let data = match (self.words, self.bytes, self.text) {
            (Some(words), None, None) => words.iter().flat_map(|w| w.0.to_le_bytes()).collect(),
            (None, Some(bytes), None) => bytes,
            (None, None, Some(text)) => text.into_bytes(),
            _ => return Err(SnapshotError::BlockContents(address)),
        };

        if data.is_empty() {
            return Err(SnapshotError::EmptyBlock(address));
        }
        Ok((address, data))
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SnapshotSymbol {
    name: String,
    address: Word,
    size: Option<Word>,
    file: Option<String>,
}

impl From<SnapshotSymbol> for SymbolEntry {
    fn from(symbol: SnapshotSymbol) -> Self {
        SymbolEntry {
            name: symbol.name,
            address: symbol.address.0,
            size: symbol.size.map_or(0, |size| size.0),
            file: symbol.file,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct TargetSnapshot {
    registers: HashMap<CoreRegister, Word>,
    memory: Vec<MemoryBlock>,
    symbols: Vec<SnapshotSymbol>,
}

/// A [`DebugHost`] answering reads from a snapshot of a halted core.
#[derive(Debug)]
pub struct SnapshotHost {
    registers: HashMap<CoreRegister, u32>,
    /// Sorted by address. Adjacent blocks are joined, so blocks neither overlap nor touch.
    memory: Vec<(u32, Vec<u8>)>,
    symbols: Rc<SymbolTable>,
}

impl SnapshotHost {
    pub fn load(path: &Path) -> Result<Self, SnapshotError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| SnapshotError::Read(e, path.to_path_buf()))?;
        let host = Self::from_yaml(&text)?;

        tracing::debug!(
            "Loaded snapshot {} with {} memory blocks",
            path.display(),
            host.memory.len()
        );
        Ok(host)
    }

    pub fn from_yaml(text: &str) -> Result<Self, SnapshotError> {
        let snapshot: TargetSnapshot = serde_yaml::from_str(text)?;

        let mut memory = snapshot
            .memory
            .into_iter()
            .map(MemoryBlock::into_bytes)
            .collect::<Result<Vec<_>, _>>()?;
        memory.sort_by_key(|(address, _)| *address);

        for pair in memory.windows(2) {
            let (other, data) = &pair[0];
            let address = pair[1].0;
            if u64::from(*other) + data.len() as u64 > u64::from(address) {
                return Err(SnapshotError::Overlap {
                    address,
                    other: *other,
                });
            }
        }

        let mut joined: Vec<(u32, Vec<u8>)> = Vec::with_capacity(memory.len());
        for (address, data) in memory {
            match joined.last_mut() {
                Some((start, previous))
                    if u64::from(*start) + previous.len() as u64 == u64::from(address) =>
                {
                    previous.extend(data);
                }
                _ => joined.push((address, data)),
            }
        }

        Ok(Self {
            registers: snapshot
                .registers
                .into_iter()
                .map(|(register, value)| (register, value.0))
                .collect(),
            memory: joined,
            symbols: Rc::new(SymbolTable::new(
                snapshot.symbols.into_iter().map(SymbolEntry::from).collect(),
            )),
        })
    }

    /// The symbol table, shared with unwinders running while the host is borrowed by a decoder.
    pub fn symbols(&self) -> Rc<SymbolTable> {
        self.symbols.clone()
    }

    /// Add the symbols of an ELF file. Must happen before the symbol table is shared.
    pub fn load_elf(&mut self, path: &Path) -> anyhow::Result<()> {
        Rc::get_mut(&mut self.symbols)
            .context("The symbol table is already in use")?
            .load_elf(path)
    }

    /// The block containing all of `address..address + len`.
    fn memory_at(&self, address: u32, len: usize) -> Result<&[u8], Error> {
        let missing = Error::MemoryRead { address, len };

        let index = match self.memory.binary_search_by_key(&address, |(start, _)| *start) {
            Ok(index) => index,
            Err(0) => return Err(missing),
            Err(index) => index - 1,
        };

        let (start, data) = &self.memory[index];
        let offset = (address - start) as usize;
        data.get(offset..)
            .and_then(|rest| rest.get(..len))
            .ok_or(missing)
    }
}

impl DebugHost for SnapshotHost {
    fn read_register(&mut self, register: CoreRegister) -> Result<u32, Error> {
        self.registers
            .get(&register)
            .copied()
            .ok_or(Error::Register(register))
    }

    fn read_32(&mut self, address: u32, data: &mut [u32]) -> Result<(), Error> {
        let bytes = self.memory_at(address, data.len() * 4)?;

        for (word, chunk) in data.iter_mut().zip(bytes.chunks_exact(4)) {
            *word = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
        Ok(())
    }

    fn read_8(&mut self, address: u32, data: &mut [u8]) -> Result<(), Error> {
        let bytes = self.memory_at(address, data.len())?;
        data.copy_from_slice(bytes);
        Ok(())
    }

    fn lookup_symbol_name(&mut self, address: u32) -> Result<String, Error> {
        self.symbols.lookup_symbol_name(address)
    }

    fn symbol_address(&mut self, name: &str) -> Result<u32, Error> {
        self.symbols.symbol_address(name)
    }
}
