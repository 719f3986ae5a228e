//! # Document Subcommands
//!
//! `build`, `sign`, `verify`, `validate`, `correct` and `replicate`. Each
//! reads one input, runs the pipeline operation of the same name and
//! writes the result as JSON. `verify` and `validate` write nothing on
//! success.

use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Args;
use docket_doc::Registry;
use docket_engine::{ops, CorrectOptions, ParseOptions};

use crate::io::{encode, Files};
use crate::keys;
use crate::GlobalOpts;

/// Flags shared by `build` and `sign`.
#[derive(Args, Debug, Default, Clone)]
pub struct ParseArgs {
    /// Set a value from YAML text, e.g. `--set customer.name=Acme`.
    #[arg(long = "set", value_name = "KEY=VALUE", value_parser = key_value)]
    pub set: Vec<(String, String)>,

    /// Set a plain string value.
    #[arg(long = "set-string", value_name = "KEY=VALUE", value_parser = key_value)]
    pub set_string: Vec<(String, String)>,

    /// Set a value from a YAML or JSON file.
    #[arg(long = "set-file", value_name = "KEY=PATH", value_parser = key_value)]
    pub set_file: Vec<(String, String)>,

    /// Template YAML/JSON file into which the input is merged.
    #[arg(short = 'T', long)]
    pub template: Option<PathBuf>,

    /// Document type, used when the input has no `$schema`.
    #[arg(short = 't', long = "type")]
    pub doc_type: Option<String>,

    /// Wrap a bare document in an envelope.
    #[arg(short = 'e', long)]
    pub envelop: bool,
}

fn key_value(arg: &str) -> Result<(String, String), String> {
    arg.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected KEY=VALUE, got '{arg}'"))
}

impl ParseArgs {
    pub fn parse_options(&self, input: Vec<u8>) -> Result<ParseOptions> {
        let template = match &self.template {
            Some(path) => {
                Some(std::fs::read(path).with_context(|| format!("reading template {}", path.display()))?)
            }
            None => None,
        };
        Ok(ParseOptions {
            template,
            input,
            doc_type: self.doc_type.clone(),
            envelop: self.envelop,
            set_yaml: self.set.iter().cloned().collect(),
            set_string: self.set_string.iter().cloned().collect(),
            set_file: self
                .set_file
                .iter()
                .map(|(k, v)| (k.clone(), PathBuf::from(v)))
                .collect::<BTreeMap<_, _>>(),
        })
    }
}

/// Arguments for `build`.
#[derive(Args, Debug, Default)]
pub struct BuildArgs {
    #[command(flatten)]
    pub files: Files,
    #[command(flatten)]
    pub parse: ParseArgs,
}

/// Arguments for `sign`.
#[derive(Args, Debug, Default)]
pub struct SignArgs {
    #[command(flatten)]
    pub files: Files,
    #[command(flatten)]
    pub parse: ParseArgs,
    /// Private key file [default: ~/.docket/id_ed25519.json].
    #[arg(short = 'k', long)]
    pub key: Option<PathBuf>,
}

/// Arguments for `verify`.
#[derive(Args, Debug, Default)]
pub struct VerifyArgs {
    #[command(flatten)]
    pub files: Files,
    /// Public key file [default: ~/.docket/id_ed25519.pub.json].
    #[arg(short = 'k', long)]
    pub key: Option<PathBuf>,
}

/// Arguments for `validate` and `replicate`.
#[derive(Args, Debug, Default)]
pub struct PlainArgs {
    #[command(flatten)]
    pub files: Files,
}

/// Arguments for `correct`.
#[derive(Args, Debug, Default)]
pub struct CorrectArgs {
    #[command(flatten)]
    pub files: Files,

    /// Print the JSON Schema of the correction options instead.
    #[arg(long)]
    pub options: bool,

    /// Issue a credit note.
    #[arg(long, conflicts_with = "debit")]
    pub credit: bool,

    /// Issue a debit note.
    #[arg(long)]
    pub debit: bool,

    /// Issue date of the correction (YYYY-MM-DD).
    #[arg(long)]
    pub date: Option<NaiveDate>,

    /// Correction options as JSON or YAML text.
    #[arg(long)]
    pub data: Option<String>,
}

pub fn run_build(
    reg: &Registry,
    args: &BuildArgs,
    opts: &GlobalOpts,
    stdin: &mut dyn Read,
    stdout: &mut dyn Write,
) -> Result<()> {
    let out = args.files.output(opts)?;
    let parse = args.parse.parse_options(args.files.read(stdin)?)?;
    let built = ops::build(reg, &parse)?;
    out.write(&encode(&built, opts.indent)?, stdout)
}

pub fn run_sign(
    reg: &Registry,
    args: &SignArgs,
    opts: &GlobalOpts,
    stdin: &mut dyn Read,
    stdout: &mut dyn Write,
) -> Result<()> {
    let out = args.files.output(opts)?;
    let key_path = match &args.key {
        Some(path) => path.clone(),
        None => keys::default_private_path()?,
    };
    let key = keys::load_private_key(&key_path)?;
    let parse = args.parse.parse_options(args.files.read(stdin)?)?;
    let signed = ops::sign(reg, &parse, &key)?;
    out.write(&encode(&signed, opts.indent)?, stdout)
}

pub fn run_verify(reg: &Registry, args: &VerifyArgs, stdin: &mut dyn Read) -> Result<()> {
    let key_path = match &args.key {
        Some(path) => path.clone(),
        None => keys::default_public_path()?,
    };
    let key = keys::load_public_key(&key_path)?;
    ops::verify(reg, &args.files.read(stdin)?, &key)?;
    Ok(())
}

pub fn run_validate(reg: &Registry, args: &PlainArgs, stdin: &mut dyn Read) -> Result<()> {
    ops::validate(reg, &args.files.read(stdin)?)?;
    Ok(())
}

pub fn run_correct(
    reg: &Registry,
    args: &CorrectArgs,
    opts: &GlobalOpts,
    stdin: &mut dyn Read,
    stdout: &mut dyn Write,
) -> Result<()> {
    let out = args.files.output(opts)?;
    let correct = CorrectOptions {
        parse: ParseOptions::new(args.files.read(stdin)?),
        options_schema: args.options,
        credit: args.credit,
        debit: args.debit,
        date: args.date,
        data: args.data.clone().map(String::into_bytes),
    };
    let corrected = ops::correct(reg, &correct)?;
    out.write(&encode(&corrected, opts.indent)?, stdout)
}

pub fn run_replicate(
    reg: &Registry,
    args: &PlainArgs,
    opts: &GlobalOpts,
    stdin: &mut dyn Read,
    stdout: &mut dyn Write,
) -> Result<()> {
    let out = args.files.output(opts)?;
    let replica = ops::replicate(reg, &ParseOptions::new(args.files.read(stdin)?))?;
    out.write(&encode(&replica, opts.indent)?, stdout)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_value_splits_on_first_equals() {
        assert_eq!(key_value("a.b=c=d").unwrap(), ("a.b".into(), "c=d".into()));
        assert!(key_value("nothing").is_err());
    }

    #[test]
    fn parse_options_from_flags() {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("tmpl.yaml");
        std::fs::write(&template, "currency: EUR\n").unwrap();
        let args = ParseArgs {
            set: vec![("customer.name".into(), "Acme".into())],
            set_string: vec![("code".into(), "0001".into())],
            set_file: vec![("supplier".into(), "supplier.yaml".into())],
            template: Some(template),
            doc_type: Some("invoice".into()),
            envelop: true,
        };
        let opts = args.parse_options(b"{}".to_vec()).unwrap();
        assert_eq!(opts.template.as_deref(), Some(&b"currency: EUR\n"[..]));
        assert_eq!(opts.set_yaml["customer.name"], "Acme");
        assert_eq!(opts.set_string["code"], "0001");
        assert_eq!(opts.set_file["supplier"], PathBuf::from("supplier.yaml"));
        assert!(opts.envelop);
    }

    #[test]
    fn missing_template_is_reported() {
        let args = ParseArgs {
            template: Some(PathBuf::from("/nonexistent/template.yaml")),
            ..Default::default()
        };
        let err = args.parse_options(Vec::new()).unwrap_err();
        assert!(err.to_string().contains("reading template"));
    }
}
