//! Build automation tasks for the UniParc index tools
//!
//! - `generate-cli-docs`: render the `uniparc-load` and `uniparc-query`
//!   command-line references to Markdown from their clap definitions

use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};
use uniparc_index::cli::{LoadArgs, QueryArgs};

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "Build automation tasks for the UniParc index tools", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Parser)]
enum Command {
    /// Generate CLI reference pages in Markdown
    GenerateCliDocs {
        /// Output directory for generated documentation
        #[arg(short, long, default_value = "docs")]
        output_dir: String,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::GenerateCliDocs { output_dir } => generate_cli_docs(Path::new(&output_dir))?,
    }

    Ok(())
}

fn generate_cli_docs(output_dir: &Path) -> anyhow::Result<()> {
    println!("Generating CLI documentation...");

    let load = clap_markdown::help_markdown::<LoadArgs>();
    let query = clap_markdown::help_markdown::<QueryArgs>();

    let content = format!(
        r#"# UniParc index CLI reference

Generated from the command-line definitions on {date}.

## Building an index

```bash
# <external_id> <content_hash> per line
zcat uniparc_md5.tsv.gz | uniparc-load --dbfile /dev/shm/uniparc.db --dbsize 1200000000
cp /dev/shm/uniparc.db /data/indexes/uniparc.db
```

Hashes that occur more than once keep every accession, tab-separated, in
input order.

## Querying

```bash
# one hash per line, any case
uniparc-query --dbfile /data/indexes/uniparc.db --batch 5000 < md5s.txt > hits.tsv
```

Output lines are `<HASH>\t<accession>[\t<accession>...]`; hashes that are
not in the index produce no line.

## Environment Variables

- `UNIPARC_DBFILE` - default for `--dbfile`
- `UNIPARC_DBSIZE` - default for `--dbsize` (loader)
- `UNIPARC_BATCH` - default for `--batch` (query)
- `LOG_LEVEL`, `LOG_OUTPUT`, `LOG_FORMAT`, `LOG_DIR`, `LOG_FILTER` - logging
- `RUST_LOG` - extra tracing filter directives

{load}

{query}

---

*To update, run `cargo run -p xtask -- generate-cli-docs`.*
"#,
        date = chrono::Utc::now().format("%Y-%m-%d"),
        load = load,
        query = query,
    );

    let output_path = PathBuf::from(output_dir);
    fs::create_dir_all(&output_path)?;

    let file_path = output_path.join("cli-reference.md");
    fs::write(&file_path, content)?;

    println!("Generated CLI documentation at: {}", file_path.display());
    Ok(())
}
