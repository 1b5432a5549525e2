pub mod callstack;
pub mod info;
pub mod logs;

use std::path::PathBuf;

use exception_view::FrameLayout;

use crate::snapshot::SnapshotHost;

/// Stack frame layout, as selected on the command line.
#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutArg {
    /// Choose from the security state of the core
    Auto,
    /// Frames on the stack selected by EXC_RETURN
    Armv7m,
    /// Secure image, frames possibly on a non-secure stack
    Armv8mSecure,
}

impl From<LayoutArg> for FrameLayout {
    fn from(layout: LayoutArg) -> Self {
        match layout {
            LayoutArg::Auto => FrameLayout::Auto,
            LayoutArg::Armv7m => FrameLayout::Armv7m,
            LayoutArg::Armv8mSecure => FrameLayout::Armv8mSecure,
        }
    }
}

/// Options shared between all views.
#[derive(clap::Parser, Debug)]
pub struct SnapshotOptions {
    /// YAML snapshot of the halted core
    snapshot: PathBuf,

    /// ELF file of the running image, for symbols and source locations
    #[clap(long)]
    elf: Option<PathBuf>,

    /// Stack frame layout of the target. Overrides the configuration file.
    #[clap(long, value_enum)]
    layout: Option<LayoutArg>,

    /// Print the rows as JSON records
    #[clap(long)]
    json: bool,
}

impl SnapshotOptions {
    pub fn load_host(&self) -> anyhow::Result<SnapshotHost> {
        let mut host = SnapshotHost::load(&self.snapshot)?;
        if let Some(elf) = &self.elf {
            host.load_elf(elf)?;
        }
        Ok(host)
    }

    pub fn layout(&self, config: &crate::Config) -> FrameLayout {
        self.layout.map_or(config.frame_layout, FrameLayout::from)
    }
}

#[cfg(test)]
mod test {
    use exception_view::{ExceptionDecoder, FrameLayout, LogDomain};
    use pretty_assertions::assert_eq;

    use crate::snapshot::SnapshotHost;
    use crate::symbols::SymbolUnwinder;

    /// A usage fault in `divide`, called from `main`, on the process stack.
    const HARD_FAULT: &str = r#"
registers:
  xPSR: 0x01000003
  LR: 0xFFFFFFFD
  PSP: 0x20001000
  SP: 0x20002000
  R4: 4
  R5: 5
  R6: 6
  R7: 7
  R8: 8
  R9: 9
  R10: 10
  R11: 11
memory:
  - address: 0x20001000
    words: [0, 1, 2, 3, 12, 0x08000121, 0x08000204, 0x01000000]
  - address: 0x20004000
    text: "boot\r\nfault ahead\r\n"
  - address: 0x20004100
    words: [19]
  - address: 0xE000ED04
    words: [3, 0]
  - address: 0xE000ED24
    words: [0, 0x00010000, 0x40000000, 0, 0, 0, 0]
  - address: 0xE000EDE4
    words: [0, 0]
  - address: 0xE000EE08
    words: [0x00010000]
symbols:
  - name: main
    address: 0x08000100
    size: 0x40
  - name: divide
    address: 0x08000200
    size: 0x10
  - name: uartOutputBuf_s
    address: 0x20004000
  - name: uartOutputBufIndex_s
    address: 0x20004100
"#;

    #[test]
    fn info_view_from_a_snapshot() {
        let host = SnapshotHost::from_yaml(HARD_FAULT).unwrap();
        let mut decoder = ExceptionDecoder::new(host, FrameLayout::Auto).show_registers(false);

        let rows = decoder
            .exception_info()
            .into_iter()
            .map(|row| row.exception_info)
            .collect::<Vec<_>>();

        assert_eq!(
            rows,
            [
                "Decoded Exception:",
                "Hard Fault: FORCED: USAGE: UNDEFINSTR",
            ]
        );
    }

    #[test]
    fn call_stack_from_symbols() {
        let host = SnapshotHost::from_yaml(HARD_FAULT).unwrap();
        let symbols = host.symbols();
        let mut unwinder = SymbolUnwinder::new(&symbols);
        let mut decoder = ExceptionDecoder::new(host, FrameLayout::Armv7m);

        let frames = decoder
            .call_stack(&mut unwinder)
            .into_iter()
            .map(|frame| frame.frame)
            .collect::<Vec<_>>();

        assert_eq!(
            frames,
            ["0    divide() PC = 0x08000204", "1    main() PC = 0x08000120"]
        );
    }

    #[test]
    fn secure_logs_from_a_snapshot() {
        let host = SnapshotHost::from_yaml(HARD_FAULT).unwrap();
        let mut decoder = ExceptionDecoder::new(host, FrameLayout::Auto);

        let lines = decoder
            .logs(LogDomain::Secure)
            .into_iter()
            .map(|line| line.msg)
            .collect::<Vec<_>>();
        assert_eq!(lines, ["boot", "fault ahead"]);

        let lines = decoder
            .logs(LogDomain::NonSecure)
            .into_iter()
            .map(|line| line.msg)
            .collect::<Vec<_>>();
        assert_eq!(
            lines,
            ["Symbol 'uartOutputBuf_ns' is not known to the debug host. Try accessing Non-Secure logs from Non-Secure image ROV"]
        );
    }
}
