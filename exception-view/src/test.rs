//! Helpers for testing the crate

use std::collections::HashMap;

use crate::{
    host::{AsyncDebugHost, DebugHost, Unwinder},
    registers::{CoreRegister, RegisterSet},
    Error,
};

/// A halted target with a register file, sparse memory and a symbol table.
#[derive(Debug, Default)]
pub(crate) struct MockTarget {
    registers: HashMap<CoreRegister, u32>,
    /// Sorted list of ranges
    values: Vec<(u32, Vec<u8>)>,
    symbols: Vec<(String, u32)>,
}

impl MockTarget {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn set_register(&mut self, register: CoreRegister, value: u32) {
        self.registers.insert(register, value);
    }

    pub(crate) fn add_symbol(&mut self, name: &str, address: u32) {
        self.symbols.push((name.to_string(), address));
    }

    pub(crate) fn add_range(&mut self, address: u32, data: Vec<u8>) {
        assert!(!data.is_empty());

        match self
            .values
            .binary_search_by_key(&address, |(addr, _data)| *addr)
        {
            Ok(index) => {
                panic!(
                    "Failed to add data at {:#010x}, already exists at {:#010x} - {:#010x}",
                    address,
                    self.values[index].0,
                    self.values[index].0 + self.values[index].1.len() as u32
                );
            }
            Err(index) => {
                // Neighbouring entries must not overlap with the new one.
                if index > 0 {
                    let previous_entry = &self.values[index - 1];
                    assert!(
                        previous_entry.0 + previous_entry.1.len() as u32 <= address,
                        "Failed to add data at {:#010x}, overlaps with entry at {:#010x}",
                        address,
                        previous_entry.0,
                    );
                }

                if index < self.values.len() {
                    let next_entry = &self.values[index];
                    assert!(
                        next_entry.0 >= address + data.len() as u32,
                        "Failed to add data at {:#010x}, overlaps with entry at {:#010x}",
                        address,
                        next_entry.0,
                    );
                }

                self.values.insert(index, (address, data));
            }
        }
    }

    pub(crate) fn add_word_range(&mut self, address: u32, data: &[u32]) {
        let mut bytes = Vec::with_capacity(data.len() * 4);

        for word in data {
            bytes.extend_from_slice(&word.to_le_bytes());
        }

        self.add_range(address, bytes);
    }
}

impl DebugHost for MockTarget {
    fn read_register(&mut self, register: CoreRegister) -> Result<u32, Error> {
        self.registers
            .get(&register)
            .copied()
            .ok_or(Error::Register(register))
    }

    fn read_32(&mut self, address: u32, data: &mut [u32]) -> Result<(), Error> {
        let mut buff = vec![0u8; data.len() * 4];

        DebugHost::read_8(self, address, &mut buff)?;

        for (i, chunk) in buff.chunks_exact(4).enumerate() {
            data[i] = u32::from_le_bytes(chunk.try_into().unwrap());
        }

        Ok(())
    }

    fn read_8(&mut self, address: u32, data: &mut [u8]) -> Result<(), Error> {
        let missing = Error::MemoryRead {
            address,
            len: data.len(),
        };

        let stored_data = match self
            .values
            .binary_search_by_key(&address, |(addr, _data)| *addr)
        {
            Ok(index) => &self.values[index].1,
            Err(0) => return Err(missing),
            Err(index) => {
                let previous_entry = &self.values[index - 1];
                let offset = (address - previous_entry.0) as usize;

                if offset >= previous_entry.1.len() {
                    return Err(missing);
                }

                &previous_entry.1[offset..]
            }
        };

        if stored_data.len() >= data.len() {
            data.copy_from_slice(&stored_data[..data.len()]);
            Ok(())
        } else {
            let len = stored_data.len();
            data[..len].copy_from_slice(stored_data);
            DebugHost::read_8(self, address + len as u32, &mut data[len..])
                .map_err(|_| missing)
        }
    }

    fn lookup_symbol_name(&mut self, address: u32) -> Result<String, Error> {
        // Code addresses carry the thumb bit.
        let address = address & !1;
        self.symbols
            .iter()
            .find(|(_, symbol)| *symbol == address)
            .map(|(name, _)| name.clone())
            .ok_or(Error::NoSymbolAt(address))
    }

    fn symbol_address(&mut self, name: &str) -> Result<u32, Error> {
        self.symbols
            .iter()
            .find(|(symbol, _)| symbol == name)
            .map(|(_, address)| *address)
            .ok_or_else(|| Error::SymbolNotFound(name.to_string()))
    }
}

#[async_trait::async_trait(?Send)]
impl AsyncDebugHost for MockTarget {
    async fn read_register(&mut self, register: CoreRegister) -> Result<u32, Error> {
        tokio::task::yield_now().await;
        DebugHost::read_register(self, register)
    }

    async fn read_32(&mut self, address: u32, data: &mut [u32]) -> Result<(), Error> {
        tokio::task::yield_now().await;
        DebugHost::read_32(self, address, data)
    }

    async fn read_8(&mut self, address: u32, data: &mut [u8]) -> Result<(), Error> {
        tokio::task::yield_now().await;
        DebugHost::read_8(self, address, data)
    }

    async fn lookup_symbol_name(&mut self, address: u32) -> Result<String, Error> {
        tokio::task::yield_now().await;
        DebugHost::lookup_symbol_name(self, address)
    }

    async fn symbol_address(&mut self, name: &str) -> Result<u32, Error> {
        tokio::task::yield_now().await;
        DebugHost::symbol_address(self, name)
    }
}

/// An unwinder producing scripted output depending on the staged PC.
#[derive(Debug, Default)]
pub(crate) struct MockUnwinder {
    frames: HashMap<u32, String>,
    /// Every register set the unwinder was called with.
    pub(crate) staged: Vec<RegisterSet>,
}

impl MockUnwinder {
    pub(crate) fn with_frames(mut self, pc: u32, lines: &[&str]) -> Self {
        self.frames.insert(pc, format!("{}\n", lines.join("\n")));
        self
    }
}

impl Unwinder for MockUnwinder {
    fn unwind_to_text(&mut self, registers: &RegisterSet) -> Result<String, Error> {
        self.staged.push(registers.clone());

        let pc = registers.get(CoreRegister::Pc).unwrap();
        Ok(self
            .frames
            .get(&pc)
            .cloned()
            .unwrap_or_else(|| "Unwind halted in frame 0: no unwind information\n".to_string()))
    }
}
