use std::string::FromUtf8Error;

use swc_core::common::input::StringInput;
use swc_core::common::sync::Lrc;
use swc_core::common::FileName;
use swc_core::common::Globals;
use swc_core::common::Mark;
use swc_core::common::SourceMap;
use swc_core::common::GLOBALS;
use swc_core::ecma::ast::EsVersion;
use swc_core::ecma::ast::Program;
use swc_core::ecma::codegen::text_writer::JsWriter;
use swc_core::ecma::parser::lexer::Lexer;
use swc_core::ecma::parser::Parser;
use swc_core::ecma::parser::Syntax;
use swc_core::ecma::transforms::base::resolver;
use swc_core::ecma::visit::VisitMut;
use swc_core::ecma::visit::VisitMutWith;

pub struct RunContext {
  /// Source-map in use
  pub source_map: Lrc<SourceMap>,
  /// Global mark from SWC resolver
  pub global_mark: Mark,
  /// Unresolved mark from SWC resolver
  pub unresolved_mark: Mark,
}

/// Code generation settings for a run
#[derive(Clone, Copy, Debug)]
pub struct RunOptions {
  /// Language level the emitter must not exceed
  pub target: EsVersion,
  /// Emit without whitespace
  pub minify: bool,
  /// Build a source map for the emitted code
  pub source_map: bool,
}

impl Default for RunOptions {
  fn default() -> Self {
    Self {
      target: EsVersion::latest(),
      minify: false,
      source_map: true,
    }
  }
}

pub struct RunVisitResult<V> {
  pub output_code: String,
  #[allow(unused)]
  pub visitor: V,
  pub source_map: Vec<u8>,
}

pub struct RunTransformResult<R> {
  pub output_code: String,
  pub result: R,
  /// Present when `RunOptions::source_map` is set
  pub source_map: Option<Vec<u8>>,
}

#[derive(Debug, thiserror::Error)]
pub enum RunWithTransformationError {
  #[error("Failed to parse script: {}", .0.kind().msg())]
  SwcParse(swc_core::ecma::parser::error::Error),
  #[error("IO Error: {0}")]
  IoError(#[from] std::io::Error),
  #[error("Invalid utf-8 output: {0}")]
  InvalidUtf8Output(#[from] FromUtf8Error),
  #[error("Failed to generate source map")]
  SourceMap(#[from] sourcemap::Error),
}

/// Runner of SWC transformations
///
/// * Parse `code` with SWC
/// * Run a visitor over it
/// * Return the result
///
pub fn run_visit<V: VisitMut>(
  code: &str,
  make_visit: impl FnOnce(RunContext) -> V,
) -> Result<RunVisitResult<V>, RunWithTransformationError> {
  let RunTransformResult {
    output_code,
    result,
    source_map,
  } = run_with_transformation(code, &RunOptions::default(), |context, program| {
    let mut visit = make_visit(context);
    program.visit_mut_with(&mut visit);
    visit
  })?;
  Ok(RunVisitResult {
    output_code,
    visitor: result,
    source_map: source_map.unwrap_or_default(),
  })
}

/// Parse code, run resolver over it, then run the `transform` function with the parsed
/// program, codegen and return the results.
///
/// Bundler output may be either a script or a module, so the input is parsed as a program.
pub fn run_with_transformation<R>(
  code: &str,
  options: &RunOptions,
  transform: impl FnOnce(RunContext, &mut Program) -> R,
) -> Result<RunTransformResult<R>, RunWithTransformationError> {
  let source_map = Lrc::new(SourceMap::default());
  let source_file = source_map.new_source_file(Lrc::new(FileName::Anon), code.into());

  let lexer = Lexer::new(
    Syntax::Es(Default::default()),
    EsVersion::latest(),
    StringInput::from(&*source_file),
    None,
  );

  let mut parser = Parser::new_from(lexer);
  let mut program = parser
    .parse_program()
    .map_err(RunWithTransformationError::SwcParse)?;

  GLOBALS.set(
    &Globals::new(),
    || -> Result<RunTransformResult<R>, RunWithTransformationError> {
      let global_mark = Mark::new();
      let unresolved_mark = Mark::new();
      program.visit_mut_with(&mut resolver(unresolved_mark, global_mark, false));

      let context = RunContext {
        source_map: source_map.clone(),
        global_mark,
        unresolved_mark,
      };
      let result = transform(context, &mut program);

      let mut line_pos_buffer = vec![];
      let mut output_buffer = vec![];
      let writer = JsWriter::new(
        source_map.clone(),
        "\n",
        &mut output_buffer,
        options.source_map.then_some(&mut line_pos_buffer),
      );
      let mut emitter = swc_core::ecma::codegen::Emitter {
        cfg: swc_core::ecma::codegen::Config::default()
          .with_target(options.target)
          .with_minify(options.minify),
        cm: source_map.clone(),
        comments: None,
        wr: writer,
      };
      emitter.emit_program(&program)?;
      let output_code = String::from_utf8(output_buffer)?;

      let output_map = if options.source_map {
        let source_map = source_map.build_source_map(&line_pos_buffer);
        let mut output_map_buffer = vec![];
        source_map.to_writer(&mut output_map_buffer)?;
        Some(output_map_buffer)
      } else {
        None
      };

      Ok(RunTransformResult {
        output_code,
        result,
        source_map: output_map,
      })
    },
  )
}

#[cfg(test)]
mod tests {
  use pretty_assertions::assert_eq;
  use swc_core::ecma::ast::Lit;
  use swc_core::ecma::ast::Str;
  use swc_core::ecma::visit::VisitMut;

  use super::*;

  struct Visitor;

  impl VisitMut for Visitor {
    fn visit_mut_lit(&mut self, n: &mut Lit) {
      *n = Lit::Str(Str::from("replacement"));
    }
  }

  #[test]
  fn test_example() {
    let code = r#"console.log('test!')"#;
    let RunVisitResult { output_code, .. } = run_visit(code, |_: RunContext| Visitor).unwrap();
    assert_eq!(
      output_code,
      r#"console.log("replacement");
"#
    );
  }

  #[test]
  fn test_scripts_and_modules_are_accepted() {
    let script = run_with_transformation("var a = 1;", &RunOptions::default(), |_, program| {
      program.is_script()
    })
    .unwrap();
    assert_eq!(script.output_code, "var a = 1;\n");
    assert!(script.result);

    let module = run_with_transformation(
      "export const a = 1;",
      &RunOptions::default(),
      |_, program| program.is_module(),
    )
    .unwrap();
    assert_eq!(module.output_code, "export const a = 1;\n");
    assert!(module.result);
  }

  #[test]
  fn test_minified_output_without_source_map() {
    let result = run_with_transformation(
      "console.log( 'test!' );\n\nconsole.log( 'other' );",
      &RunOptions {
        minify: true,
        source_map: false,
        ..RunOptions::default()
      },
      |_, _| (),
    )
    .unwrap();

    assert!(result.output_code.starts_with("console.log("));
    assert!(!result.output_code.contains(' '));
    assert!(result.source_map.is_none());
  }

  #[test]
  fn test_source_map_is_produced() {
    let result = run_with_transformation("console.log('test!')", &RunOptions::default(), |_, _| ())
      .unwrap();

    let map = sourcemap::SourceMap::from_slice(&result.source_map.unwrap()).unwrap();
    assert!(map.get_token_count() > 0);
  }

  #[test]
  fn test_parse_errors_are_reported() {
    let result = run_visit("console.log(", |_: RunContext| Visitor);
    assert!(matches!(
      result,
      Err(RunWithTransformationError::SwcParse(_))
    ));
  }
}
