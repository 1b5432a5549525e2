//! Symbol lookup for the command line host, and a stack unwinder working on symbols alone.

use std::path::Path;

use addr2line::Loader;
use anyhow::Context;
use exception_view::{CoreRegister, Error, RegisterSet, Unwinder};
use object::{Object, ObjectSymbol, SymbolKind};

/// A named range of target memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolEntry {
    pub name: String,
    pub address: u32,
    pub size: u32,
    /// Source file of the symbol, if known without debug information.
    pub file: Option<String>,
}

impl SymbolEntry {
    fn contains(&self, address: u32) -> bool {
        address >= self.address && address - self.address < self.size.max(1)
    }
}

/// The symbols known to the host: those listed in a snapshot, and those of an ELF file.
#[derive(Default)]
pub struct SymbolTable {
    symbols: Vec<SymbolEntry>,
    loader: Option<Loader>,
}

impl std::fmt::Debug for SymbolTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SymbolTable")
            .field("symbols", &self.symbols)
            .field("debug_info", &self.loader.is_some())
            .finish()
    }
}

impl SymbolTable {
    pub fn new(symbols: Vec<SymbolEntry>) -> Self {
        Self {
            symbols,
            loader: None,
        }
    }

    /// Add the function and data symbols of the ELF file at `path`.
    ///
    /// Source locations are taken from its debug information, if there is any.
    pub fn load_elf(&mut self, path: &Path) -> anyhow::Result<()> {
        let buffer =
            std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
        let elf = object::File::parse(buffer.as_slice()).context("Failed to parse ELF file")?;

        let before = self.symbols.len();
        for symbol in elf.symbols() {
            if !matches!(symbol.kind(), SymbolKind::Text | SymbolKind::Data) {
                continue;
            }
            let Ok(name) = symbol.name() else {
                continue;
            };
            let Ok(address) = u32::try_from(symbol.address()) else {
                continue;
            };
            if name.is_empty() {
                continue;
            }

            self.symbols.push(SymbolEntry {
                name: name.to_string(),
                // Thumb function symbols have bit 0 set.
                address: if symbol.kind() == SymbolKind::Text {
                    address & !1
                } else {
                    address
                },
                size: u32::try_from(symbol.size()).unwrap_or(u32::MAX),
                file: None,
            });
        }
        tracing::debug!(
            "Loaded {} symbols from {}",
            self.symbols.len() - before,
            path.display()
        );

        // The error returned from Loader::new cannot be converted directly to anyhow::Error,
        // due to a limitation in addr2line.
        match Loader::new(path) {
            Ok(loader) => self.loader = Some(loader),
            Err(e) => tracing::warn!("No debug information in {}: {e}", path.display()),
        }

        Ok(())
    }

    /// The symbol containing `address`. Code addresses may carry the thumb bit.
    pub fn symbol_at(&self, address: u32) -> Option<&SymbolEntry> {
        let address = address & !1;
        self.symbols.iter().find(|symbol| symbol.contains(address))
    }

    /// The address of the symbol called `name`.
    pub fn address_of(&self, name: &str) -> Option<u32> {
        self.symbols
            .iter()
            .find(|symbol| symbol.name == name)
            .map(|symbol| symbol.address)
    }

    /// The source location of `address`, as `file:line` if the line is known.
    pub fn location(&self, address: u32) -> Option<String> {
        let address = address & !1;

        let from_debug_info = self.loader.as_ref().and_then(|loader| {
            loader
                .find_location(u64::from(address))
                .ok()
                .flatten()
                .and_then(|location| {
                    let file = location.file?;
                    Some(match location.line {
                        Some(line) => format!("{file}:{line}"),
                        None => file.to_string(),
                    })
                })
        });

        from_debug_info.or_else(|| self.symbol_at(address)?.file.clone())
    }

    pub fn lookup_symbol_name(&self, address: u32) -> Result<String, Error> {
        self.symbol_at(address)
            .map(|symbol| symbol.name.clone())
            .ok_or(Error::NoSymbolAt(address))
    }

    pub fn symbol_address(&self, name: &str) -> Result<u32, Error> {
        self.address_of(name)
            .ok_or_else(|| Error::SymbolNotFound(name.to_string()))
    }
}

/// Unwinds using the symbol table only: the frame at PC and the frame its return
/// address in LR points to.
///
/// Frames without a symbol end the unwind, so a PC outside of known code produces
/// nothing but the closing `Unwind halted` line.
pub struct SymbolUnwinder<'a> {
    symbols: &'a SymbolTable,
}

impl<'a> SymbolUnwinder<'a> {
    pub fn new(symbols: &'a SymbolTable) -> Self {
        Self { symbols }
    }

    fn frame(&self, number: usize, pc: u32) -> Option<String> {
        let symbol = self.symbols.symbol_at(pc)?;
        let mut frame = format!("{number} {}() PC = {:#010x}", symbol.name, pc & !1);
        if let Some(location) = self.symbols.location(pc) {
            frame.push_str(" at ");
            frame.push_str(&location);
        }
        Some(frame)
    }
}

impl Unwinder for SymbolUnwinder<'_> {
    fn unwind_to_text(&mut self, registers: &RegisterSet) -> Result<String, Error> {
        let pc = registers
            .get(CoreRegister::Pc)
            .ok_or_else(|| Error::Unwind("PC is not staged".to_string()))?;

        let mut frames = Vec::new();
        let halted = match self.frame(0, pc) {
            None => format!("Unwind halted in frame 0: no symbol covers PC = {pc:#010x}"),
            Some(frame) => {
                frames.push(frame);

                let lr = registers.get(CoreRegister::Lr).unwrap_or_default();
                match self.frame(1, lr) {
                    Some(frame) if lr & !1 != pc & !1 => {
                        frames.push(frame);
                        "Unwind halted in frame 2: no unwind information".to_string()
                    }
                    _ => format!("Unwind halted in frame 1: no symbol covers LR = {lr:#010x}"),
                }
            }
        };
        frames.push(halted);

        Ok(frames.join("\n"))
    }
}
