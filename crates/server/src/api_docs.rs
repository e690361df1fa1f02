//! Machine-readable description of the gateway routes, served at
//! `/api-docs.json` in swagger 2.0 shape.

use serde_json::{json, Map, Value};

pub struct RouteDoc {
    pub method: &'static str,
    pub path: &'static str,
    pub summary: &'static str,
    pub takes_body: bool,
}

pub const ROUTES: &[RouteDoc] = &[
    RouteDoc {
        method: "get",
        path: "/intents",
        summary: "List intents of the active workspace",
        takes_body: false,
    },
    RouteDoc {
        method: "post",
        path: "/intents",
        summary: "Create an intent from a name and example utterances",
        takes_body: true,
    },
    RouteDoc {
        method: "post",
        path: "/intents/{intentId}",
        summary: "Replace an intent's name and examples",
        takes_body: true,
    },
    RouteDoc {
        method: "get",
        path: "/workspaces",
        summary: "List workspaces visible to the active credentials",
        takes_body: false,
    },
    RouteDoc {
        method: "post",
        path: "/workspaces",
        summary: "Create a workspace",
        takes_body: true,
    },
    RouteDoc {
        method: "get",
        path: "/workspaces/{workspaceId}",
        summary: "Export a workspace with intents, entities and dialog nodes",
        takes_body: false,
    },
    RouteDoc {
        method: "post",
        path: "/workspace/{workspaceId}",
        summary: "Select the active workspace",
        takes_body: false,
    },
    RouteDoc {
        method: "post",
        path: "/config",
        summary: "Replace active credentials and workspace",
        takes_body: true,
    },
    RouteDoc {
        method: "post",
        path: "/api/message",
        summary: "Send one conversational turn to the active workspace",
        takes_body: true,
    },
];

impl RouteDoc {
    fn path_parameters(&self) -> impl Iterator<Item = &'static str> {
        self.path
            .split('/')
            .filter_map(|segment| segment.strip_prefix('{').and_then(|rest| rest.strip_suffix('}')))
    }

    fn operation(&self) -> Value {
        let mut parameters: Vec<Value> = self
            .path_parameters()
            .map(|name| json!({ "name": name, "in": "path", "required": true, "type": "string" }))
            .collect();
        if self.takes_body {
            parameters.push(json!({
                "name": "body",
                "in": "body",
                "required": true,
                "schema": { "type": "object" },
            }));
        }

        json!({
            "summary": self.summary,
            "consumes": ["application/json"],
            "produces": ["application/json"],
            "parameters": parameters,
            "responses": {
                "200": { "description": "Success" },
                "500": { "description": "Backend call failed" },
            },
        })
    }
}

pub fn document() -> Value {
    let mut paths = Map::new();
    for route in ROUTES {
        let entry = paths.entry(route.path).or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(methods) = entry {
            methods.insert(route.method.to_string(), route.operation());
        }
    }

    json!({
        "swagger": "2.0",
        "info": {
            "title": "Parley dialog gateway",
            "version": env!("CARGO_PKG_VERSION"),
        },
        "basePath": "/",
        "paths": paths,
    })
}
