use anyhow::{Context, Result};
use clap::Parser;
use ilwasm::{compile, parser::parse_listing, CompileOptions, ExportPolicy, HostBridge};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// ilwasm — compile IL listings to structured WebAssembly modules.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Input IL listing (.il)
    input: PathBuf,

    /// Output file, or a directory to write `<assembly>.wasm` into
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Host bridge manifest (TOML)
    #[arg(long)]
    bridge: Option<PathBuf>,

    /// Object header length in bytes
    #[arg(long, default_value_t = 8)]
    header_size: u32,

    /// Which methods to export
    #[arg(long, value_enum, default_value_t = ExportPolicy::Public)]
    export: ExportPolicy,

    /// Compile this method (full name) as an interop thunk; repeatable
    #[arg(long = "interop", value_name = "METHOD")]
    interop: Vec<String>,

    /// Skip validation of the emitted module
    #[arg(long)]
    no_validate: bool,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose, cli.quiet);
    run(&cli)
}

fn setup_logging(verbose: u8, quiet: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("warn"),
            1 => EnvFilter::new("info"),
            2 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    let formatter = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true);

    tracing_subscriber::registry()
        .with(formatter)
        .with(filter)
        .init();
}

fn options_from(cli: &Cli) -> Result<CompileOptions> {
    let bridge = match &cli.bridge {
        Some(path) => HostBridge::load(path)?,
        None => HostBridge::default(),
    };
    Ok(CompileOptions {
        object_header_size: cli.header_size,
        export_policy: cli.export,
        interop_methods: cli.interop.clone(),
        bridge,
        validate: !cli.no_validate,
    })
}

/// Where the artifact for `assembly` goes.
fn output_path(cli: &Cli, assembly: &str) -> PathBuf {
    match &cli.output {
        None => cli.input.with_extension("wasm"),
        Some(out) => {
            let text = out.to_string_lossy();
            if out.is_dir() || text.ends_with('/') || text.ends_with(std::path::MAIN_SEPARATOR) {
                out.join(format!("{}.wasm", assembly))
            } else {
                out.clone()
            }
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let options = options_from(cli)?;

    info!("compiling {}", cli.input.display());
    let text = fs::read_to_string(&cli.input)
        .with_context(|| format!("failed to read {}", cli.input.display()))?;
    let source = parse_listing(&text).with_context(|| format!("in {}", cli.input.display()))?;

    // Nothing is written unless compilation succeeds.
    let wasm = compile(&source, &options)?;

    let path = output_path(cli, &source.assembly);
    create_parent(&path)?;
    fs::write(&path, &wasm).with_context(|| format!("failed to write {}", path.display()))?;
    info!("wrote {} ({} bytes)", path.display(), wasm.len());
    Ok(())
}

fn create_parent(path: &Path) -> Result<()> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => fs::create_dir_all(dir)
            .with_context(|| format!("failed to create directory {}", dir.display())),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("ilwasm-cli-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn cli_parses_defaults() {
        let cli = Cli::parse_from(["ilwasm", "input.il"]);
        assert_eq!(cli.input, PathBuf::from("input.il"));
        assert!(cli.output.is_none());
        assert_eq!(cli.header_size, 8);
        assert_eq!(cli.export, ExportPolicy::Public);
        assert!(cli.interop.is_empty());
        assert!(!cli.no_validate);
    }

    #[test]
    fn cli_parses_repeated_interop() {
        let cli = Cli::parse_from([
            "ilwasm",
            "in.il",
            "--interop",
            "System.Int32 A.B::C()",
            "--interop",
            "System.Void A.B::D()",
            "--export",
            "all",
            "-vv",
        ]);
        assert_eq!(cli.interop.len(), 2);
        assert_eq!(cli.export, ExportPolicy::All);
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn directory_output_uses_assembly_name() {
        let dir = scratch("dir");
        let cli = Cli::parse_from(["ilwasm", "x.il", "-o", dir.to_str().unwrap()]);
        assert_eq!(output_path(&cli, "MyLibrary"), dir.join("MyLibrary.wasm"));

        let cli = Cli::parse_from(["ilwasm", "src/x.il"]);
        assert_eq!(output_path(&cli, "MyLibrary"), PathBuf::from("src/x.wasm"));
    }

    #[test]
    fn failed_compilation_writes_nothing() {
        let dir = scratch("fail");
        let input = dir.join("bad.il");
        fs::write(
            &input,
            ".assembly Bad\n.class C\n{\n.method public static void F()\n{\nIL_0000: ldnull\nIL_0001: pop\nIL_0002: ret\n}\n}\n",
        )
        .unwrap();
        let out = dir.join("out").join("bad.wasm");
        let cli = Cli::parse_from(["ilwasm", input.to_str().unwrap(), "-o", out.to_str().unwrap()]);

        let err = run(&cli).unwrap_err();
        assert!(format!("{:#}", err).contains("unsupported instruction: ldnull"));
        assert!(!out.exists());
        assert!(!dir.join("out").exists());
    }

    #[test]
    fn successful_compilation_creates_directories() -> Result<()> {
        let dir = scratch("ok");
        let input = dir.join("ok.il");
        fs::write(
            &input,
            ".assembly Ok\n.class public C\n{\n.method public static int32 F()\n{\nIL_0000: ldc.i4.3\nIL_0001: ret\n}\n}\n",
        )?;
        let out = dir.join("nested").join("deeper").join("ok.wasm");
        let cli = Cli::parse_from(["ilwasm", input.to_str().unwrap(), "-o", out.to_str().unwrap()]);
        run(&cli)?;
        let bytes = fs::read(&out)?;
        assert_eq!(&bytes[..4], b"\0asm");
        Ok(())
    }
}
