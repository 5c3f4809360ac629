mod serve;

use std::process;

use clap::{Parser, Subcommand, ValueEnum};

use boletin_core::{workflow, WorkflowState};

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Boletin document workflow service.
#[derive(Parser)]
#[command(name = "boletin", version, about = "Boletin document workflow service")]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the Boletin HTTP API server
    Serve {
        /// Port to listen on
        #[arg(long, default_value = "8080")]
        port: u16,
    },

    /// Print the workflow transition table, or the targets for one state
    Transitions {
        /// Workflow state (DRAFT, REVIEW, APPROVED, PUBLISHED, ARCHIVED)
        state: Option<String>,
    },
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { port } => {
            let rt = tokio::runtime::Runtime::new().expect("failed to create tokio runtime");
            if let Err(e) = rt.block_on(serve::start_server(port)) {
                eprintln!("Server error: {}", e);
                process::exit(1);
            }
        }
        Commands::Transitions { state } => {
            cmd_transitions(state.as_deref(), cli.output, cli.quiet);
        }
    }
}

fn cmd_transitions(state: Option<&str>, output: OutputFormat, quiet: bool) {
    let states: Vec<WorkflowState> = match state {
        Some(raw) => match raw.parse::<WorkflowState>() {
            Ok(s) => vec![s],
            Err(e) => {
                report_error(&format!("error: {}", e), output, quiet);
                process::exit(1);
            }
        },
        None => WorkflowState::ALL.to_vec(),
    };

    if quiet {
        return;
    }

    match output {
        OutputFormat::Json => {
            let table: serde_json::Map<String, serde_json::Value> = states
                .iter()
                .map(|s| {
                    let targets: Vec<&str> = workflow::allowed_transitions(*s)
                        .iter()
                        .map(|t| t.as_str())
                        .collect();
                    (s.as_str().to_string(), serde_json::json!(targets))
                })
                .collect();
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::Value::Object(table))
                    .unwrap_or_default()
            );
        }
        OutputFormat::Text => {
            for s in states {
                let targets = workflow::allowed_transitions(s);
                if targets.is_empty() {
                    println!("{} (terminal)", s);
                } else {
                    let list: Vec<&str> = targets.iter().map(|t| t.as_str()).collect();
                    println!("{} -> {}", s, list.join(", "));
                }
            }
        }
    }
}

pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("{}", msg),
        OutputFormat::Json => {
            eprintln!("{{\"error\": \"{}\"}}", msg.replace('"', "\\\""));
        }
    }
}
