use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use pa_core::{parse_soap_text, prepare, ClinicalNote, PayerRuleSet, PrepareInput};

#[derive(Parser)]
#[command(name = "pa")]
#[command(about = "Prior-authorization drafting CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Prepare a prior-authorization draft and print it as JSON
    Prepare {
        /// Payer (medical aid) name, e.g. Discovery
        #[arg(long)]
        payer: String,
        /// Procedure code, e.g. TKR
        #[arg(long)]
        procedure: String,
        /// JSON file holding the SOAP note
        #[arg(long)]
        soap: PathBuf,
        /// Plain-text consultation transcript (optional)
        #[arg(long)]
        transcript: Option<PathBuf>,
        /// Payer rules file; built-in rules when omitted
        #[arg(long)]
        rules: Option<PathBuf>,
    },
    /// Inspect payer rules
    Rules {
        #[command(subcommand)]
        command: RulesCommand,
    },
    /// Parse labelled SOAP text into a structured note
    ParseSoap {
        /// Text file with SUBJECTIVE/OBJECTIVE/ASSESSMENT/PLAN labels
        file: PathBuf,
    },
}

#[derive(Subcommand)]
enum RulesCommand {
    /// Validate a rules file (JSON or YAML)
    Validate {
        file: PathBuf,
    },
    /// Print the active rules as JSON
    Show {
        #[arg(long)]
        rules: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    println!("{}", run(cli.command)?);
    Ok(())
}

fn run(command: Commands) -> anyhow::Result<String> {
    match command {
        Commands::Prepare {
            payer,
            procedure,
            soap,
            transcript,
            rules,
        } => {
            let rules = load_rules(rules.as_deref())?;
            let transcript = match transcript {
                Some(path) => read_text(&path)?,
                None => String::new(),
            };
            let input = PrepareInput {
                payer,
                procedure_code: procedure,
                soap: Some(read_note(&soap)?),
                transcript,
            };
            let draft = prepare(&rules, &input)?;
            Ok(serde_json::to_string_pretty(&draft)?)
        }
        Commands::Rules {
            command: RulesCommand::Validate { file },
        } => {
            let rules = PayerRuleSet::load(&file)
                .with_context(|| format!("rules file {} is invalid", file.display()))?;
            let procedures: usize = rules
                .payer_names()
                .map(|payer| rules.procedures(payer).count())
                .sum();
            Ok(format!(
                "{} is valid: {} payer(s), {} procedure(s)",
                file.display(),
                rules.payer_names().count(),
                procedures
            ))
        }
        Commands::Rules {
            command: RulesCommand::Show { rules },
        } => Ok(load_rules(rules.as_deref())?.to_json_string_pretty()?),
        Commands::ParseSoap { file } => {
            let note = parse_soap_text(&read_text(&file)?);
            Ok(serde_json::to_string_pretty(&note)?)
        }
    }
}

fn load_rules(path: Option<&Path>) -> anyhow::Result<PayerRuleSet> {
    match path {
        Some(path) => PayerRuleSet::load(path)
            .with_context(|| format!("failed to load rules from {}", path.display())),
        None => Ok(PayerRuleSet::builtin_default()),
    }
}

fn read_text(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn read_note(path: &Path) -> anyhow::Result<ClinicalNote> {
    let text = read_text(path)?;
    serde_json::from_str(&text)
        .with_context(|| format!("{} is not a SOAP note in JSON form", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn temp_file(suffix: &str, contents: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn prepare_prints_draft_json() {
        let soap = temp_file(
            ".json",
            r#"{"assessment": "Severe osteoarthritis of right knee"}"#,
        );
        let transcript = temp_file(".txt", "The patient is a 65 year old...");

        let output = run(Commands::Prepare {
            payer: "Discovery".into(),
            procedure: "TKR".into(),
            soap: soap.path().to_path_buf(),
            transcript: Some(transcript.path().to_path_buf()),
            rules: None,
        })
        .unwrap();

        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["fields"]["patient_age"], "65");
        assert_eq!(value["confidence"]["diagnosis"], "high");
    }

    #[test]
    fn prepare_fails_for_unknown_payer() {
        let soap = temp_file(".json", "{}");
        let result = run(Commands::Prepare {
            payer: "Acme".into(),
            procedure: "TKR".into(),
            soap: soap.path().to_path_buf(),
            transcript: None,
            rules: None,
        });
        assert!(result.unwrap_err().to_string().contains("Acme"));
    }

    #[test]
    fn rules_validate_accepts_yaml_and_rejects_empty() {
        let good = temp_file(
            ".yaml",
            "payers:\n  Bonitas:\n    procedures:\n      THR:\n        name: Total Hip Replacement\n        requirements: [Diagnosis]\n",
        );
        let output = run(Commands::Rules {
            command: RulesCommand::Validate {
                file: good.path().to_path_buf(),
            },
        })
        .unwrap();
        assert!(output.contains("1 payer(s), 1 procedure(s)"));

        let bad = temp_file(".json", r#"{"payers": {}}"#);
        assert!(run(Commands::Rules {
            command: RulesCommand::Validate {
                file: bad.path().to_path_buf(),
            },
        })
        .is_err());
    }

    #[test]
    fn rules_show_defaults_to_builtin() {
        let output = run(Commands::Rules {
            command: RulesCommand::Show { rules: None },
        })
        .unwrap();
        assert!(output.contains("Total Knee Replacement"));
    }

    #[test]
    fn parse_soap_prints_note() {
        let file = temp_file(".txt", "SUBJECTIVE: knee pain\nPLAN: replace knee");
        let output = run(Commands::ParseSoap {
            file: file.path().to_path_buf(),
        })
        .unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["subjective"], "knee pain");
        assert_eq!(value["plan"], "replace knee");
    }
}
