use exception_view::ExceptionDecoder;

use crate::cmd::SnapshotOptions;
use crate::symbols::SymbolUnwinder;
use crate::util::print_rows;
use crate::Config;

/// Unwind the call stack of the code interrupted by the exception
///
/// Frames are resolved with the symbols of the snapshot and of the ELF file given with `--elf`.
#[derive(clap::Parser)]
pub struct Cmd {
    #[clap(flatten)]
    shared: SnapshotOptions,
}

impl Cmd {
    pub fn run(self, config: &Config) -> anyhow::Result<()> {
        let host = self.shared.load_host()?;
        let symbols = host.symbols();
        let mut unwinder = SymbolUnwinder::new(&symbols);

        let mut decoder = ExceptionDecoder::new(host, self.shared.layout(config));
        let frames = decoder.call_stack(&mut unwinder);

        print_rows(&frames, self.shared.json, |frame| frame.frame.as_str())
    }
}
