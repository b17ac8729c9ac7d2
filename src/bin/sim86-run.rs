use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use sim86::{cycles::estimate_cycles, decode_region, names, CpuConfig, Layout, Session};

#[derive(Parser, Debug)]
#[command(author, version, about = "Decode or run an 8086 binary on the sim86 simulator")]
struct Opts {
    /// Stop after this many instructions.
    #[arg(short, long, default_value_t = 1_000_000)]
    steps: u64,
    #[arg(short, long, value_enum)]
    layout: Option<LayoutArg>,
    /// JSON file holding a `CpuConfig`.
    #[arg(short, long)]
    config: Option<String>,
    /// Print the decoded instruction stream instead of running it.
    #[arg(short, long)]
    decode: bool,
    #[arg(value_name = "BINFILE")]
    input: String,
}

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum LayoutArg {
    Segmented,
    Flat,
}

impl From<LayoutArg> for Layout {
    fn from(arg: LayoutArg) -> Self {
        match arg {
            LayoutArg::Segmented => Layout::Segmented,
            LayoutArg::Flat => Layout::Flat,
        }
    }
}

#[derive(serde::Serialize)]
struct Decoded {
    offset: usize,
    mnemonic: &'static str,
    #[serde(flatten)]
    instruction: sim86::Instruction,
    cycles: Option<sim86::cycles::CycleEstimate>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let opts = Opts::parse();
    let bytes = std::fs::read(&opts.input).with_context(|| format!("reading {}", opts.input))?;

    if opts.decode {
        let mut offset = 0;
        let mut out = Vec::new();
        for inst in decode_region(&bytes)? {
            out.push(Decoded {
                offset,
                mnemonic: names::mnemonic(inst.op),
                instruction: inst,
                cycles: estimate_cycles(&inst),
            });
            offset += inst.size as usize;
        }
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    let mut cfg = match &opts.config {
        Some(path) => {
            let text = std::fs::read_to_string(path).with_context(|| format!("reading {path}"))?;
            serde_json::from_str::<CpuConfig>(&text).with_context(|| format!("parsing {path}"))?
        }
        None => CpuConfig::default(),
    };
    if let Some(layout) = opts.layout {
        cfg.layout = layout.into();
    }

    let mut session = Session::load(cfg, &bytes)?;
    match session.run(opts.steps) {
        Ok(n) => tracing::info!(steps = n, halted = session.halted(), "run finished"),
        Err(trap) => eprintln!("TRAP: {trap}"),
    }

    println!("{}", serde_json::to_string_pretty(session.regs())?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_flag_maps_onto_the_library_layout() {
        let opts = Opts::try_parse_from(["sim86-run", "--layout", "flat", "prog.bin"]).unwrap();
        assert_eq!(opts.layout.map(Layout::from), Some(Layout::Flat));

        let opts = Opts::try_parse_from(["sim86-run", "-l", "segmented", "prog.bin"]).unwrap();
        assert_eq!(opts.layout.map(Layout::from), Some(Layout::Segmented));

        assert!(Opts::try_parse_from(["sim86-run", "--layout", "paged", "prog.bin"]).is_err());
    }
}
