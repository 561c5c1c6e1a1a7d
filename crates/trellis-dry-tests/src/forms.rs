// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Builders for the node shapes most tests start from.
use serde_json::Value;
use trellis_core::{Graph, GraphResult, NodeId, NodeOptions};

/// Handles of the `login` fixture form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoginForm {
    /// The `login` group.
    pub form: NodeId,
    /// The `email` input.
    pub email: NodeId,
    /// The `password` input.
    pub password: NodeId,
}

/// Build `login { email, password }` with empty-string inputs.
pub fn login_form(graph: &mut Graph) -> GraphResult<LoginForm> {
    let email = graph.create_node(NodeOptions::input("email").value(""))?;
    let password = graph.create_node(NodeOptions::input("password").value(""))?;
    let form = graph.create_node(NodeOptions::group("login").child(email).child(password))?;
    Ok(LoginForm {
        form,
        email,
        password,
    })
}

/// Build a list named `name` whose children are inputs holding `values`.
///
/// Returns the list followed by its children in order.
pub fn list_of(
    graph: &mut Graph,
    name: &str,
    values: impl IntoIterator<Item = Value>,
) -> GraphResult<(NodeId, Vec<NodeId>)> {
    let list = graph.create_node(NodeOptions::list(name))?;
    let mut children = Vec::new();
    for (i, value) in values.into_iter().enumerate() {
        let child = graph.create_node(
            NodeOptions::input(format!("item{i}"))
                .value(value)
                .parent(list),
        )?;
        children.push(child);
    }
    Ok((list, children))
}

/// Build a group named `name` with one input per `(name, value)` pair.
pub fn group_of<'a>(
    graph: &mut Graph,
    name: &str,
    fields: impl IntoIterator<Item = (&'a str, Value)>,
) -> GraphResult<(NodeId, Vec<NodeId>)> {
    let group = graph.create_node(NodeOptions::group(name))?;
    let mut children = Vec::new();
    for (field, value) in fields {
        children.push(graph.create_node(NodeOptions::input(field).value(value).parent(group))?);
    }
    Ok((group, children))
}
