use postbuild_core::types::OptimizationOptions;
use postbuild_sourcemap::compose_source_maps;
use postbuild_sourcemap::offset_source_map_lines;
use postbuild_swc_runner::run_with_transformation;
use postbuild_swc_runner::RunContext;
use postbuild_swc_runner::RunOptions;
use swc_core::common::util::take::Take;
use swc_core::ecma::ast::Program;
use swc_core::ecma::minifier::optimize;
use swc_core::ecma::minifier::option::CompressOptions;
use swc_core::ecma::minifier::option::ExtraOptions;
use swc_core::ecma::minifier::option::MangleOptions;
use swc_core::ecma::minifier::option::MinifyOptions;
use swc_core::ecma::minifier::option::TopLevelOptions;
use swc_core::ecma::transforms::base::fixer::fixer;
use swc_core::ecma::visit::VisitMutWith;

use crate::es_version;
use crate::extract_license_comments;
use crate::prepend_license_comments;
use crate::GlobalDefines;
use crate::TransformError;
use crate::TransformOutput;

#[derive(Clone, Copy, Debug)]
enum Stage {
  /// Defines, dead code removal and local mangling in a single pass
  Structural,
  /// Repeated compression with top-level inlining for modules
  Exhaustive { passes: usize },
}

/// Minify a bundled script in two stages.
///
/// The first stage replaces defined globals and removes dead code. The second stage runs the
/// compressor again over the already reduced output, which exposes inlining opportunities the
/// first stage could not see. License comments are moved to the top of the output unless
/// `remove_licenses` is set.
pub fn optimize_script(
  code: &str,
  options: &OptimizationOptions,
  source_map: bool,
) -> Result<TransformOutput, TransformError> {
  let licenses = if options.remove_licenses {
    Vec::new()
  } else {
    extract_license_comments(code)
  };

  let run_options = RunOptions {
    target: es_version(options.target),
    minify: true,
    source_map,
  };

  let structural = run_with_transformation(code, &run_options, |context, program| {
    program.visit_mut_with(&mut GlobalDefines::new(
      &options.define,
      context.unresolved_mark,
    ));
    minify_program(program, context, options, Stage::Structural);
  })?;

  let passes = if options.advanced { 3 } else { 2 };
  let exhaustive = run_with_transformation(
    &structural.output_code,
    &run_options,
    |context, program| minify_program(program, context, options, Stage::Exhaustive { passes }),
  )?;

  let source_map = match (structural.source_map, exhaustive.source_map) {
    (Some(structural), Some(exhaustive)) => Some(compose_source_maps(&structural, &exhaustive)?),
    _ => None,
  };

  let (code, added_lines) = prepend_license_comments(&exhaustive.output_code, &licenses);
  let source_map = match source_map {
    Some(map) => Some(offset_source_map_lines(&map, added_lines)?),
    None => None,
  };

  tracing::trace!(licenses = licenses.len(), passes, "Optimized script");

  Ok(TransformOutput { code, source_map })
}

fn minify_program(
  program: &mut Program,
  context: RunContext,
  options: &OptimizationOptions,
  stage: Stage,
) {
  // Top level names of a script are globals shared with other scripts
  let top_level = program.is_module();

  let (passes, compress_top_level) = match stage {
    Stage::Structural => (1, None),
    Stage::Exhaustive { passes } => (
      passes,
      top_level.then_some(TopLevelOptions { functions: true }),
    ),
  };

  let minify_options = MinifyOptions {
    compress: Some(CompressOptions {
      passes,
      keep_fnames: options.keep_names,
      keep_classnames: options.keep_names,
      drop_debugger: true,
      dead_code: true,
      unused: true,
      conditionals: true,
      evaluate: true,
      join_vars: true,
      side_effects: true,
      top_level: compress_top_level,
      ..Default::default()
    }),
    mangle: Some(MangleOptions {
      keep_fn_names: options.keep_names,
      keep_class_names: options.keep_names,
      top_level: Some(top_level),
      ..Default::default()
    }),
    ..Default::default()
  };

  let optimized = optimize(
    program.take(),
    context.source_map,
    None,
    None,
    &minify_options,
    &ExtraOptions {
      unresolved_mark: context.unresolved_mark,
      top_level_mark: context.global_mark,
      mangle_name_cache: None,
    },
  );

  *program = optimized;
  program.visit_mut_with(&mut fixer(None));
}
