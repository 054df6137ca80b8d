use std::{path::PathBuf, sync::LazyLock};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use xshell::{Shell, cmd};

#[derive(Parser)]
#[command(name = "xtask", about = "Selfrel project automation")]
#[command(styles = clap_cargo::style::CLAP_STYLING)]
#[clap(disable_version_flag = true, bin_name = "cargo xtask")]
struct Cli {
  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Format code
  Fmt {
    /// Check formatting without making changes
    #[arg(long)]
    check: bool,
  },
  /// Lint code and check formatting
  Lint {
    /// Fix lint issues automatically
    #[arg(long)]
    fix: bool,
  },
  /// Run the test suite, doctests and examples
  Test {
    /// Also run the library tests under Miri (requires nightly)
    #[arg(long)]
    miri: bool,
  },
}

/// Project root directory.
static ROOT: LazyLock<Option<PathBuf>> = LazyLock::new(|| {
  std::path::Path::new(env!("CARGO_MANIFEST_DIR")).parent().map(std::path::Path::to_path_buf)
});

/// Example binaries exercised by `cargo xtask test`.
const EXAMPLES: &[&str] = &["stack", "remap"];

fn main() -> Result<()> {
  let cli = Cli::parse();

  let mut sh = Shell::new()?;
  sh.set_current_dir(ROOT.as_deref().context("xtask has no parent directory")?);

  match cli.command {
    Command::Fmt { check } => fmt(&sh, check),
    Command::Lint { fix } => lint(&sh, fix),
    Command::Test { miri } => test(&sh, miri),
  }
}

fn fmt(sh: &Shell, check: bool) -> Result<()> {
  let args =
    std::iter::once("--all").chain(check.then_some(["--", "--check"]).into_iter().flatten());
  cmd!(sh, "cargo +nightly fmt {args...}").run_echo()?;
  Ok(())
}

fn lint(sh: &Shell, fix: bool) -> Result<()> {
  let args =
    if fix { ["--fix", "--allow-dirty", "--allow-staged"] } else { ["--", "-D", "warnings"] };
  cmd!(sh, "cargo clippy --workspace --tests --examples --benches --all-features {args...}")
    .run_echo()?;
  // The core must build without the derive macro.
  cmd!(sh, "cargo clippy -p selfrel --no-default-features {args...}").run_echo()?;
  fmt(sh, !fix)
}

fn test(sh: &Shell, miri: bool) -> Result<()> {
  cmd!(sh, "cargo test --workspace --all-features").run_echo()?;
  cmd!(sh, "cargo test -p selfrel --no-default-features --lib --test atomic").run_echo()?;
  for example in EXAMPLES {
    cmd!(sh, "cargo run -p selfrel --release --example {example}").run_echo()?;
  }
  if miri {
    cmd!(sh, "cargo +nightly miri test -p selfrel --lib").run_echo()?;
  }
  Ok(())
}
