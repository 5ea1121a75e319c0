use leptos::prelude::*;

use crate::components::er_canvas::{Cardinality, Connection, ErCanvas, GraphData, Node};

/// Small university schema to start from.
fn sample_diagram() -> GraphData {
	let attribute = |id: &str, label: &str, x: f64, y: f64, parent: &str, key: bool| {
		let mut node = Node::attribute(id, label, x, y, parent);
		node.is_primary_key = key;
		node
	};
	let mut phones = attribute("a_phones", "phones", -260.0, 90.0, "e_student", false);
	phones.is_multivalued = true;
	let mut age = attribute("a_age", "age", -140.0, 120.0, "e_student", false);
	age.is_derived = true;

	let nodes = vec![
		Node::entity("e_student", "Student", -200.0, 0.0),
		attribute("a_sid", "student_id", -300.0, -80.0, "e_student", true),
		attribute("a_sname", "name", -160.0, -100.0, "e_student", false),
		phones,
		age,
		Node::entity("e_course", "Course", 200.0, 0.0),
		attribute("a_code", "code", 160.0, -100.0, "e_course", true),
		attribute("a_title", "title", 300.0, -80.0, "e_course", false),
		Node::relationship("r_enrolls", "Enrolls", 0.0, 0.0),
		attribute("a_grade", "grade", 0.0, 100.0, "r_enrolls", false),
	];

	let mut connections: Vec<Connection> = nodes
		.iter()
		.filter_map(|n| {
			let parent = n.parent_id.as_deref()?;
			Some(Connection::new(format!("c_{}", n.id), parent, n.id.clone()))
		})
		.collect();
	connections.push(
		Connection::new("c_student_enrolls", "e_student", "r_enrolls").with_cardinality(Cardinality::N),
	);
	connections.push(
		Connection::new("c_enrolls_course", "r_enrolls", "e_course").with_cardinality(Cardinality::M),
	);

	GraphData::new(nodes, connections)
}

/// Default Home Page
#[component]
pub fn Home() -> impl IntoView {
	let diagram = Signal::derive(sample_diagram);

	view! {
		<ErrorBoundary fallback=|errors| {
			view! {
				<h1>"Uh oh! Something went wrong!"</h1>

				<p>"Errors: "</p>
				<ul>
					{move || {
						errors
							.get()
							.into_iter()
							.map(|(_, e)| view! { <li>{e.to_string()}</li> })
							.collect_view()
					}}
				</ul>
			}
		}>

			<div class="fullscreen-graph">
				<ErCanvas data=diagram fullscreen=true />
				<div class="graph-overlay">
					<h1>"ER Diagram Editor"</h1>
					<p class="subtitle">
						"Drag to move. Shift-click to multi-select. Space or right-drag to pan. Scroll to zoom."
					</p>
				</div>
			</div>
		</ErrorBoundary>
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn sample_has_no_dangling_connections() {
		let graph = sample_diagram();
		for conn in &graph.connections {
			assert!(graph.contains(&conn.source_id), "{}", conn.id);
			assert!(graph.contains(&conn.target_id), "{}", conn.id);
		}
		assert_eq!(graph.connections.len(), 9);
	}
}
