//! Configuration translation pipeline: turns a declarative service
//! description into a normalized service model, an ordered route table,
//! and the upstream clusters it references.
//!
//! | Module | Responsibility |
//! |--------|----------------|
//! | [`uri_template`] | URI-template engine |
//! | [`ordering`] | method ordering for the route table |
//! | [`builder`] | service-model builder pipeline |
//! | [`routes`] | route-table generator |
//! | [`filters`] | per-route filter binder |
//! | [`clusters`] | cluster assembly |
//! | [`xds`] | output wire types |
//! | [`addr`] | backend-address parsing shared by builder phases 1 and 5 |

pub mod addr;
pub mod builder;
pub mod clusters;
pub mod filters;
pub mod ordering;
pub mod routes;
pub mod uri_template;
pub mod xds;

use gwxlate_kernel::descriptor::ServiceDescription;
use gwxlate_kernel::error::BuildResult;
use gwxlate_kernel::model::ServiceModel;
use gwxlate_kernel::openid::OidcResolver;
use gwxlate_kernel::options::Options;
use xds::{Cluster, RouteConfiguration};

/// The full output of one translation run.
pub struct TranslationOutput {
    pub model: ServiceModel,
    pub route_configuration: RouteConfiguration,
    pub clusters: Vec<Cluster>,
}

/// Run the whole pipeline: build the service model, then derive the route
/// table and cluster list from it. A single entry point from a service
/// description and options to a route table and cluster list.
pub async fn translate(
    desc: &ServiceDescription,
    config_id: &str,
    options: &Options,
    oidc: &dyn OidcResolver,
) -> BuildResult<TranslationOutput> {
    let model = builder::build(desc, config_id, options, oidc).await?;
    let route_configuration = routes::generate_routes(&model, options)?;
    let clusters = clusters::assemble_clusters(&model);
    Ok(TranslationOutput {
        model,
        route_configuration,
        clusters,
    })
}
