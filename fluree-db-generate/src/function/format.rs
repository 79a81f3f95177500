//! `st:format(template, arg1, ..., argN)`
//!
//! Substitutes the unquoted text of each argument into the template using
//! positional format directives:
//!
//! ```text
//! %[index$][-][width][.precision]conversion
//! ```
//!
//! Conversions: `s` (text), `S` (upper-cased text), `d` (integer), plus the
//! literal directives `%%` and `%n`. The template is either a literal or an
//! IRI; an IRI is fetched once (accept `*/*`) and its text used as template.

use super::{display_name, Function};
use crate::binding::Binding;
use crate::context::ExecutionContext;
use crate::error::{GenerateError, Result};
use crate::expr::Expr;
use crate::fetch::LookUpRequest;
use crate::term::Term;
use async_trait::async_trait;
use fluree_vocab::{media_types, st};

/// The `st:format` function
#[derive(Debug, Clone, Copy, Default)]
pub struct FormatFunction;

impl FormatFunction {
    fn call_label(args: &[Expr]) -> String {
        let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        format!("{}({})", display_name(st::FORMAT), args.join(", "))
    }

    /// Resolve the working template text
    async fn template_text(template: &Term, call: &str, ctx: &ExecutionContext<'_>) -> Result<String> {
        match template {
            Term::Literal { lexical, .. } => Ok(lexical.to_string()),
            Term::Iri(iri) => {
                let request = LookUpRequest::new(iri.to_string(), media_types::ANY);
                let stream = ctx.fetcher.open(&request).await.ok_or_else(|| {
                    tracing::warn!(request = %request, "could not look up format template");
                    GenerateError::Format {
                        call: call.to_string(),
                        message: format!("could not look up document <{iri}>"),
                    }
                })?;
                let text = tokio::task::spawn_blocking(move || stream.read_to_string())
                    .await
                    .map_err(|e| GenerateError::Internal(format!("template read task failed: {e}")))?
                    .map_err(|e| GenerateError::Format {
                        call: call.to_string(),
                        message: format!("I/O error while reading document <{iri}>: {e}"),
                    })?;
                tracing::debug!(request = %request, bytes = text.len(), "loaded format template");
                Ok(text)
            }
            Term::Blank(_) => Err(GenerateError::Configuration(format!(
                "{call}: first argument must be a URI or a String, got {template}"
            ))),
        }
    }
}

#[async_trait]
impl Function for FormatFunction {
    fn build(&self, args: &[Expr]) -> Result<()> {
        if args.is_empty() {
            return Err(GenerateError::arity(
                display_name(st::FORMAT),
                "expecting at least one argument",
            ));
        }
        Ok(())
    }

    async fn exec(
        &self,
        binding: &Binding,
        args: &[Expr],
        ctx: &ExecutionContext<'_>,
    ) -> Result<Term> {
        self.build(args)?;
        let call = Self::call_label(args);

        let mut values = Vec::with_capacity(args.len());
        for (i, expr) in args.iter().enumerate() {
            match expr.eval(binding, ctx).await {
                Ok(value) => values.push(value),
                Err(e) => {
                    let message = format!(
                        "Error executing {call} with expression {expr} and binding {binding}: {e}"
                    );
                    tracing::debug!(call = %call, argument = i, error = %e, "format argument failed");
                    if !ctx.debug_template() {
                        return Err(GenerateError::Format { call, message });
                    }
                    let diagnostic = format!("\n<<<<<<<<<< {message} >>>>>>>>>>\n");
                    if i == 0 {
                        // No usable template; the diagnostic is the output.
                        return Ok(Term::string(diagnostic));
                    }
                    values.push(Term::string(diagnostic));
                }
            }
        }

        let template = Self::template_text(&values[0], &call, ctx).await?;
        let params: Vec<String> = values[1..].iter().map(Term::to_unquoted_string).collect();
        let output = format_positional(&template, &params).map_err(|message| {
            GenerateError::Format {
                call: call.clone(),
                message: format!("{message} (binding {binding})"),
            }
        })?;
        Ok(Term::string(output))
    }
}

/// Substitute `args` into `template` using positional format directives
///
/// Every directive must find its argument and every argument must be
/// referenced; otherwise the error message describes the mismatch.
pub fn format_positional(template: &str, args: &[String]) -> std::result::Result<String, String> {
    let chars: Vec<char> = template.chars().collect();
    let mut out = String::with_capacity(template.len());
    let mut used = vec![false; args.len()];
    let mut next_ordinary = 0usize;
    let mut i = 0;

    while i < chars.len() {
        if chars[i] != '%' {
            out.push(chars[i]);
            i += 1;
            continue;
        }
        let start = i;
        i += 1;

        let mut index = None;
        let digits_end = scan_digits(&chars, i);
        if digits_end > i && chars.get(digits_end) == Some(&'$') {
            let n = parse_number(&chars[i..digits_end])?;
            if n == 0 {
                return Err("illegal argument index 0 (indices start at 1)".to_string());
            }
            index = Some(n - 1);
            i = digits_end + 1;
        }

        let mut left_justify = false;
        while chars.get(i) == Some(&'-') {
            left_justify = true;
            i += 1;
        }

        let width_end = scan_digits(&chars, i);
        let width = if width_end > i {
            Some(parse_number(&chars[i..width_end])?)
        } else {
            None
        };
        i = width_end;

        let mut precision = None;
        if chars.get(i) == Some(&'.') {
            let precision_end = scan_digits(&chars, i + 1);
            if precision_end == i + 1 {
                return Err(format!(
                    "missing precision in format specifier '{}'",
                    chars[start..precision_end].iter().collect::<String>()
                ));
            }
            precision = Some(parse_number(&chars[i + 1..precision_end])?);
            i = precision_end;
        }

        let Some(&conversion) = chars.get(i) else {
            return Err(format!(
                "incomplete format specifier '{}' at end of template",
                chars[start..].iter().collect::<String>()
            ));
        };
        i += 1;
        let directive: String = chars[start..i].iter().collect();

        if left_justify && width.is_none() {
            return Err(format!("format specifier '{directive}' needs a width to left-justify"));
        }

        let text = match conversion {
            '%' => {
                if index.is_some() || precision.is_some() {
                    return Err(format!("illegal format specifier '{directive}'"));
                }
                "%".to_string()
            }
            'n' => {
                if index.is_some() || width.is_some() || precision.is_some() {
                    return Err(format!("illegal format specifier '{directive}'"));
                }
                out.push('\n');
                continue;
            }
            's' | 'S' | 'd' => {
                let idx = index.unwrap_or_else(|| {
                    let k = next_ordinary;
                    next_ordinary += 1;
                    k
                });
                let arg = args.get(idx).ok_or_else(|| {
                    format!(
                        "missing argument for format specifier '{directive}' ({} argument(s) given)",
                        args.len()
                    )
                })?;
                used[idx] = true;
                match conversion {
                    'd' => {
                        if precision.is_some() {
                            return Err(format!(
                                "precision is not allowed in integer specifier '{directive}'"
                            ));
                        }
                        let n: i64 = arg.trim().parse().map_err(|_| {
                            format!("format specifier '{directive}' expects an integer, got \"{arg}\"")
                        })?;
                        n.to_string()
                    }
                    _ => {
                        let text = if conversion == 'S' {
                            arg.to_uppercase()
                        } else {
                            arg.clone()
                        };
                        match precision {
                            Some(p) => text.chars().take(p).collect(),
                            None => text,
                        }
                    }
                }
            }
            other => {
                return Err(format!(
                    "unknown format conversion '{other}' in specifier '{directive}'"
                ))
            }
        };

        pad_into(&mut out, &text, width, left_justify);
    }

    if let Some(unused) = used.iter().position(|u| !u) {
        return Err(format!(
            "{} argument(s) given but argument {} is not referenced by the template",
            args.len(),
            unused + 1
        ));
    }
    Ok(out)
}

fn scan_digits(chars: &[char], from: usize) -> usize {
    let mut i = from;
    while i < chars.len() && chars[i].is_ascii_digit() {
        i += 1;
    }
    i
}

fn parse_number(digits: &[char]) -> std::result::Result<usize, String> {
    let s: String = digits.iter().collect();
    s.parse()
        .map_err(|_| format!("number '{s}' out of range in format specifier"))
}

fn pad_into(out: &mut String, text: &str, width: Option<usize>, left_justify: bool) {
    let len = text.chars().count();
    let pad = width.map(|w| w.saturating_sub(len)).unwrap_or(0);
    if !left_justify {
        out.extend(std::iter::repeat(' ').take(pad));
    }
    out.push_str(text);
    if left_justify {
        out.extend(std::iter::repeat(' ').take(pad));
    }
}
