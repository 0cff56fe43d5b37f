/// Test fixtures: representative sensor pages.
///
/// Each fixture exercises one rule of the table locator or one cell shape
/// of the row extractor. They are trimmed copies of the ASP.NET grid the
/// site renders:
///
///   table#GridView1
///     tr > th ...                  — header row
///     tr > td  location
///          td  > table > tr > td   — level, wrapped in a nested table
///          td  (> table > tr > td) — date/time, sometimes nested
///
/// html5ever inserts `<tbody>` elements, so rows are never direct children
/// of the table element.

/// The production layout: id present, nested level and timestamp tables.
#[cfg(test)]
pub(crate) fn fixture_gridview_page() -> &'static str {
    r#"<!DOCTYPE html>
<html>
<head><title>Water Level Sensor</title></head>
<body>
  <table class="layout"><tr><td>VMC header</td><td>menu</td></tr></table>
  <table id="GridView1" class="mGrid" cellspacing="0">
    <tr><th>Location</th><th>Water Level (Feet)</th><th>Date &amp; Time</th></tr>
    <tr>
      <td> AJWA DAM </td>
      <td><table><tr><td>211.45</td></tr></table></td>
      <td><table><tr><td>12-08-2025 10:15:00</td></tr></table></td>
    </tr>
    <tr>
      <td>AKOTA BRIDGE</td>
      <td><table><tr><td> 9.80 </td></tr></table></td>
      <td>12-08-2025 10:10:00</td>
    </tr>
    <tr>
      <td>KALA GHODA</td>
      <td><table><tr><td>7.25</td></tr></table></td>
      <td></td>
    </tr>
  </table>
</body>
</html>"#
}

/// Id renamed; a class containing "grid" still identifies the table.
#[cfg(test)]
pub(crate) fn fixture_class_grid_page() -> &'static str {
    r#"<html><body>
  <table class="nav"><tr><td>Home</td><td>About</td></tr></table>
  <table class="SensorGridView striped">
    <tr><td>SAMA HARNI BRIDGE</td><td>12.10</td><td>12-08-2025 09:00:00</td></tr>
    <tr><td>VADSAR BRIDGE</td><td>14.02</td><td>12-08-2025 09:05:00</td></tr>
  </table>
</body></html>"#
}

/// No id, no useful class; only the caption mentions water level.
#[cfg(test)]
pub(crate) fn fixture_keyword_page() -> &'static str {
    r#"<html><body>
  <table><tr><td>Notice</td><td>Monsoon advisory</td></tr></table>
  <table>
    <caption>Live Water Level Readings</caption>
    <tr><td>ASOJ FEEDER</td><td>3.4</td></tr>
    <tr><td>MUJMAUDA BRIDGE</td><td>5.1</td></tr>
  </table>
</body></html>"#
}

/// Nothing identifying at all; the only candidate is a table with enough rows.
#[cfg(test)]
pub(crate) fn fixture_large_table_page() -> &'static str {
    r#"<html><body>
  <table><tr><td>a</td><td>b</td></tr></table>
  <table>
    <tr><td>S1</td><td>1.0</td></tr>
    <tr><td>S2</td><td>2.0</td></tr>
    <tr><td>S3</td><td>3.0</td></tr>
    <tr><td>S4</td><td>4.0</td></tr>
    <tr><td>S5</td><td>5.0</td></tr>
    <tr><td>S6</td><td>6.0</td></tr>
  </table>
</body></html>"#
}

/// Third column holds a number (a second reading), not a timestamp.
#[cfg(test)]
pub(crate) fn fixture_numeric_third_column_page() -> &'static str {
    r#"<html><body>
  <table id="GridView1">
    <tr><td>PRATAPPURA DAM</td><td>180.5</td><td>180.25</td></tr>
  </table>
</body></html>"#
}

/// A table that matches but has only header and single-cell rows.
#[cfg(test)]
pub(crate) fn fixture_header_only_page() -> &'static str {
    r#"<html><body>
  <table id="GridView1">
    <tr><th>Location</th><th>Water Level (Feet)</th></tr>
    <tr><td colspan="2">No records found</td></tr>
  </table>
</body></html>"#
}

/// Block page returned to unwelcome clients.
#[cfg(test)]
pub(crate) fn fixture_no_table_page() -> &'static str {
    r#"<html><body><h1>Request Rejected</h1><p>Support ID: 1234</p></body></html>"#
}
