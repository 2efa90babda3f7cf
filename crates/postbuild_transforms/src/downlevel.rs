use std::str::FromStr;

use postbuild_swc_runner::run_with_transformation;
use postbuild_swc_runner::RunOptions;
use swc_core::common::comments::SingleThreadedComments;
use swc_core::ecma::ast::EsVersion;
use swc_core::ecma::ast::Pass;
use swc_core::ecma::preset_env::preset_env;
use swc_core::ecma::preset_env::Config;
use swc_core::ecma::preset_env::Targets;
use swc_core::ecma::preset_env::Version;
use swc_core::ecma::preset_env::Versions;
use swc_core::ecma::transforms::base::feature::FeatureFlag;
use swc_core::ecma::transforms::base::fixer::fixer;
use swc_core::ecma::transforms::base::helpers::inject_helpers;
use swc_core::ecma::transforms::base::helpers::Helpers;
use swc_core::ecma::transforms::base::helpers::HELPERS;
use swc_core::ecma::transforms::base::hygiene::hygiene;
use swc_core::ecma::transforms::base::assumptions::Assumptions;
use swc_core::ecma::visit::VisitMutWith;

use crate::LocalizeTemplateObjects;
use crate::TransformError;
use crate::TransformOutput;

/// Browser the downleveled bundle must run in
const LEGACY_BROWSER_VERSION: &str = "11.0.0";

#[derive(Clone, Copy, Debug, Default)]
pub struct DownlevelOptions {
  pub minify: bool,
  pub source_map: bool,
}

/// Rewrite an ES2015+ bundle into ES5.
///
/// `$localize` tagged templates are lowered to calls with an explicit template object first,
/// so translations can still be inlined into the downleveled output.
pub fn downlevel_to_es5(
  code: &str,
  options: &DownlevelOptions,
) -> Result<TransformOutput, TransformError> {
  let version = Version::from_str(LEGACY_BROWSER_VERSION)
    .map_err(|_| TransformError::InvalidTarget(LEGACY_BROWSER_VERSION.to_string()))?;
  let targets = Targets::Versions(Versions {
    ie: Some(version),
    ..Default::default()
  });

  let result = run_with_transformation(
    code,
    &RunOptions {
      target: EsVersion::Es5,
      minify: options.minify,
      source_map: options.source_map,
    },
    |context, program| {
      program.visit_mut_with(&mut LocalizeTemplateObjects);

      HELPERS.set(&Helpers::new(false), || {
        let mut env = preset_env(
          context.unresolved_mark,
          None::<SingleThreadedComments>,
          Config {
            targets: Some(targets),
            ..Default::default()
          },
          Assumptions::default(),
          &mut FeatureFlag::default(),
        );
        env.process(program);

        program.visit_mut_with(&mut inject_helpers(context.unresolved_mark));
      });

      program.visit_mut_with(&mut hygiene());
      program.visit_mut_with(&mut fixer(None));
    },
  )?;

  Ok(TransformOutput {
    code: result.output_code,
    source_map: result.source_map,
  })
}
