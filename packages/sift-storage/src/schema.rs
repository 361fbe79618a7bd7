pub fn render_schema() -> String {
	expand_includes(include_str!("../../../sql/init.sql"))
}

fn expand_includes(sql: &str) -> String {
	let mut out = String::new();

	for line in sql.lines() {
		let trimmed = line.trim();

		if let Some(path) = trimmed.strip_prefix("\\ir ") {
			match path.trim() {
				"tables/001_analysis_logs.sql" =>
					out.push_str(include_str!("../../../sql/tables/001_analysis_logs.sql")),
				"tables/002_scenarios.sql" =>
					out.push_str(include_str!("../../../sql/tables/002_scenarios.sql")),
				"tables/003_scenario_versions.sql" =>
					out.push_str(include_str!("../../../sql/tables/003_scenario_versions.sql")),
				"tables/004_analysis_log_results.sql" =>
					out.push_str(include_str!("../../../sql/tables/004_analysis_log_results.sql")),
				"tables/005_analysis_log_entities.sql" =>
					out.push_str(include_str!("../../../sql/tables/005_analysis_log_entities.sql")),
				"tables/006_intent_meta.sql" =>
					out.push_str(include_str!("../../../sql/tables/006_intent_meta.sql")),
				"tables/007_analysis_log_intents.sql" =>
					out.push_str(include_str!("../../../sql/tables/007_analysis_log_intents.sql")),
				_ => out.push_str(line),
			}
		} else {
			out.push_str(line);
		}

		out.push('\n');
	}

	out
}

#[cfg(test)]
mod tests {
	use crate::schema;

	#[test]
	fn every_include_is_expanded() {
		let sql = schema::render_schema();

		assert!(!sql.contains("\\ir "));

		for table in [
			"analysis_logs",
			"scenarios",
			"scenario_versions",
			"analysis_log_results",
			"analysis_log_entities",
			"intent_meta",
			"analysis_log_intents",
		] {
			assert!(
				sql.contains(&format!("CREATE TABLE IF NOT EXISTS {table} (")),
				"missing table {table}"
			);
		}
	}
}
