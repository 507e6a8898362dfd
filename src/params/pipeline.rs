use super::args::Arg;
use super::descriptor::ParameterDescriptor;
use super::extract::{coerce, ExtractorTable};
use crate::context::RequestContext;
use crate::error::DispatchError;
use tracing::debug;

/// Binds a route's descriptors against one request.
///
/// Each descriptor goes straight to the extractor for its source kind. A
/// missing value takes the descriptor's default, then the required check
/// applies.
#[derive(Clone, Default)]
pub struct ParameterPipeline {
    extractors: ExtractorTable,
}

impl ParameterPipeline {
    #[must_use]
    pub fn new(extractors: ExtractorTable) -> Self {
        Self { extractors }
    }

    #[must_use]
    pub fn extractors(&self) -> &ExtractorTable {
        &self.extractors
    }

    /// Resolve every descriptor, in order, into positional arguments.
    pub fn resolve(
        &self,
        descriptors: &[ParameterDescriptor],
        ctx: &mut RequestContext,
    ) -> Result<Vec<Arg>, DispatchError> {
        let mut args = Vec::with_capacity(descriptors.len());
        for descriptor in descriptors {
            let extractor = self.extractors.get(descriptor.kind);
            let mut arg = extractor(descriptor, &mut *ctx)?;

            if arg.is_absent() {
                if let Some(default) = descriptor.default_value.as_deref() {
                    arg = coerce(descriptor, &[default])?;
                }
            }
            if arg.is_absent() && descriptor.required {
                debug!(
                    request_id = %ctx.request_id(),
                    param = %descriptor.name,
                    kind = %descriptor.kind,
                    "Required parameter missing"
                );
                return Err(DispatchError::MissingRequiredParameter {
                    name: descriptor.name.to_string(),
                    kind: descriptor.kind,
                });
            }
            args.push(arg);
        }

        debug!(
            request_id = %ctx.request_id(),
            bound = args.len(),
            "Parameters bound"
        );
        Ok(args)
    }
}
