/// Shortest round-trip formatting for values appearing in report lines.
pub(crate) fn fmt_f64(x: f64) -> String {
    ryu::Buffer::new().format(x).to_owned()
}
