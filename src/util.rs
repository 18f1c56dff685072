//! Small path and list helpers.

use crate::hosts::DataCenter;

/// Path of a stream endpoint: `/streams/{name}` followed by `extra`, if any.
///
/// ```
/// use c8_client::util::full_stream_path;
///
/// assert_eq!(full_stream_path("_polog", None), "/streams/_polog");
/// assert_eq!(full_stream_path("_polog", Some("/compaction")), "/streams/_polog/compaction");
/// ```
pub fn full_stream_path(name: &str, extra: Option<&str>) -> String {
    format!("/streams/{}{}", name, extra.unwrap_or(""))
}

/// Comma-separated data-center names, in list order.
pub fn dc_list_string(data_centers: &[DataCenter]) -> String {
    data_centers
        .iter()
        .map(|dc| dc.name.as_str())
        .collect::<Vec<_>>()
        .join(",")
}
