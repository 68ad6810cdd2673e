//! Plan formatting through template pairs.
//!
//! A formatter is an ordered list of (name-template, content-template)
//! pairs; rendering a [`Plan`] against every pair yields one migration file
//! per pair. Templates are handlebars with a few registered helpers:
//! `upper` (uppercase a string), `cap` (uppercase the first character),
//! `now` (a freshly minted version), and `directives` (the plan's file
//! directive block, validated).

use std::io::Write;

use handlebars::{Context, Handlebars, Helper, HelperResult, Output, RenderContext, RenderError};
use once_cell::sync::Lazy;

use crate::directive::{delim, parse_directive, DIRECTIVE_DELIMITER};
use crate::error::{MigrateError, MigrateResult};
use crate::file::MigrationFile;
use crate::plan::Plan;
use crate::version::new_version;

/// Formats a plan into one or more migration files.
pub trait Formatter {
    /// Format the given plan into migration files.
    fn format(&self, plan: &Plan) -> MigrateResult<Vec<MigrationFile>>;
}

const DEFAULT_NAME_TEMPLATE: &str =
    "{{#if version}}{{version}}{{else}}{{now}}{{/if}}{{#if name}}_{{name}}{{/if}}.sql";
const DEFAULT_CONTENT_TEMPLATE: &str = "{{directives this}}{{#each changes}}{{#if comment}}-- {{cap comment}}\n{{/if}}{{cmd}}{{#if @root.delimiter}}{{@root.delimiter}}{{else}};{{/if}}\n{{/each}}";

/// A [`Formatter`] rendering an ordered list of template pairs.
pub struct TemplateFormatter {
    registry: Handlebars<'static>,
    pairs: usize,
}

impl TemplateFormatter {
    /// Create a formatter from (name-template, content-template) pairs.
    pub fn new(pairs: &[(&str, &str)]) -> MigrateResult<TemplateFormatter> {
        if pairs.is_empty() {
            return Err(MigrateError::Format("no template pairs given".into()));
        }
        let mut registry = Handlebars::new();
        registry.register_escape_fn(handlebars::no_escape);
        registry.register_helper("upper", Box::new(upper_helper));
        registry.register_helper("cap", Box::new(cap_helper));
        registry.register_helper("now", Box::new(now_helper));
        registry.register_helper("directives", Box::new(directives_helper));
        for (i, (name, content)) in pairs.iter().enumerate() {
            registry.register_template_string(&format!("name_{i}"), name)?;
            registry.register_template_string(&format!("content_{i}"), content)?;
        }
        Ok(TemplateFormatter { registry, pairs: pairs.len() })
    }

    /// The default formatter: `{version}[_{name}].sql` files with one
    /// statement per line, terminated by the plan's delimiter or `;`.
    pub fn default_formatter() -> &'static TemplateFormatter {
        static DEFAULT: Lazy<TemplateFormatter> = Lazy::new(|| {
            TemplateFormatter::new(&[(DEFAULT_NAME_TEMPLATE, DEFAULT_CONTENT_TEMPLATE)])
                .expect("default templates are valid")
        });
        &DEFAULT
    }

    /// Like [`Formatter::format`], but expects exactly one rendered file.
    pub fn format_file(&self, plan: &Plan) -> MigrateResult<MigrationFile> {
        let mut files = self.format(plan)?;
        if files.len() != 1 {
            return Err(MigrateError::Format(format!(
                "expected a single file, got {}",
                files.len()
            )));
        }
        Ok(files.swap_remove(0))
    }

    /// Render the plan and write every file's content to `w`.
    pub fn format_to(&self, plan: &Plan, w: &mut dyn Write) -> MigrateResult<()> {
        for f in self.format(plan)? {
            w.write_all(f.bytes())?;
        }
        Ok(())
    }
}

impl Formatter for TemplateFormatter {
    fn format(&self, plan: &Plan) -> MigrateResult<Vec<MigrationFile>> {
        let mut files = Vec::with_capacity(self.pairs);
        for i in 0..self.pairs {
            let name = self.registry.render(&format!("name_{i}"), plan)?;
            let content = self.registry.render(&format!("content_{i}"), plan)?;
            files.push(MigrationFile::new(name, content));
        }
        Ok(files)
    }
}

// The plan's file directive block: the delimiter directive (stored form,
// escaped) followed by the plan's own directives, validated, newline-joined
// and detached from the statements by a blank line. Empty when there are no
// directives at all.
fn plan_directives(p: &Plan) -> MigrateResult<String> {
    let mut ds = Vec::new();
    if !p.delimiter.is_empty() {
        ds.push(delim(&p.delimiter));
    }
    for d in &p.directives {
        match parse_directive(d) {
            None => return Err(MigrateError::Format(format!("invalid directive: {d:?}"))),
            Some((name, _)) if name == DIRECTIVE_DELIMITER && !p.delimiter.is_empty() => {
                return Err(MigrateError::Format(format!(
                    "duplicate directive: {d:?}. delimiter already set"
                )));
            }
            Some(_) => ds.push(d.clone()),
        }
    }
    if ds.is_empty() {
        return Ok(String::new());
    }
    Ok(format!("{}\n\n", ds.join("\n")))
}

fn upper_helper(
    h: &Helper,
    _: &Handlebars,
    _: &Context,
    _: &mut RenderContext,
    out: &mut dyn Output,
) -> HelperResult {
    let s = h.param(0).and_then(|v| v.value().as_str()).unwrap_or("");
    out.write(&s.to_uppercase())?;
    Ok(())
}

fn cap_helper(
    h: &Helper,
    _: &Handlebars,
    _: &Context,
    _: &mut RenderContext,
    out: &mut dyn Output,
) -> HelperResult {
    let s = h.param(0).and_then(|v| v.value().as_str()).unwrap_or("");
    let mut chars = s.chars();
    if let Some(first) = chars.next() {
        out.write(&first.to_uppercase().collect::<String>())?;
        out.write(chars.as_str())?;
    }
    Ok(())
}

fn now_helper(
    _: &Helper,
    _: &Handlebars,
    _: &Context,
    _: &mut RenderContext,
    out: &mut dyn Output,
) -> HelperResult {
    out.write(&new_version())?;
    Ok(())
}

fn directives_helper(
    h: &Helper,
    _: &Handlebars,
    _: &Context,
    _: &mut RenderContext,
    out: &mut dyn Output,
) -> HelperResult {
    let value = h
        .param(0)
        .map(|v| v.value().clone())
        .ok_or_else(|| RenderError::new("directives: missing plan parameter"))?;
    let plan: Plan = serde_json::from_value(value)
        .map_err(|e| RenderError::new(format!("directives: invalid plan: {e}")))?;
    let block = plan_directives(&plan).map_err(|e| RenderError::new(e.to_string()))?;
    out.write(&block)?;
    Ok(())
}
