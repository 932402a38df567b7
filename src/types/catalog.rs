//! Built-in node type catalog
//!
//! Stands in for the host runtime's type enumeration: every node type the
//! engine can instantiate is declared here, once, with its family, required
//! input count, and default property values. The registry index is built
//! from this list at startup.

use super::descriptor::TypeDescriptor;
use super::family::Family;
use crate::graph::PropertyValue;

use Family::{Channel, Container, Data, Geometry, Material, Visual};
use PropertyValue::{Boolean, Float, Integer, Text};

/// All built-in node types
pub fn builtin_types() -> Vec<TypeDescriptor> {
    vec![
        // --- Visual: generators ---
        TypeDescriptor::new("circleFx", Visual)
            .with_default("radius", Float(0.5))
            .with_default("segments", Integer(64)),
        TypeDescriptor::new("rectangleFx", Visual)
            .with_default("width", Float(1.0))
            .with_default("height", Float(1.0)),
        TypeDescriptor::new("noiseFx", Visual)
            .with_default("amplitude", Float(1.0))
            .with_default("period", Float(4.0)),
        TypeDescriptor::new("constantFx", Visual).with_default("color", Text("0 0 0".into())),
        TypeDescriptor::new("rampFx", Visual).with_default("direction", Text("horizontal".into())),
        TypeDescriptor::new("textFx", Visual).with_default("text", Text("text".into())),
        TypeDescriptor::new("videoInFx", Visual).with_default("device", Integer(0)),
        TypeDescriptor::new("movieInFx", Visual)
            .with_default("file", Text(String::new()))
            .with_default("play", Boolean(true)),
        TypeDescriptor::new("renderFx", Visual),
        // --- Visual: filters ---
        TypeDescriptor::new("blurFx", Visual)
            .with_min_inputs(1)
            .with_default("size", Float(5.0)),
        TypeDescriptor::new("levelFx", Visual)
            .with_min_inputs(1)
            .with_default("gamma", Float(1.0))
            .with_default("opacity", Float(1.0)),
        TypeDescriptor::new("invertFx", Visual).with_min_inputs(1),
        TypeDescriptor::new("transformFx", Visual)
            .with_min_inputs(1)
            .with_default("translate_x", Float(0.0))
            .with_default("translate_y", Float(0.0))
            .with_default("rotate", Float(0.0)),
        TypeDescriptor::new("cropFx", Visual).with_min_inputs(1),
        TypeDescriptor::new("feedbackFx", Visual).with_min_inputs(1),
        TypeDescriptor::new("switchFx", Visual)
            .with_min_inputs(1)
            .with_default("index", Integer(0)),
        TypeDescriptor::new("pixelateFx", Visual)
            .with_min_inputs(1)
            .with_default("cells", Integer(32)),
        TypeDescriptor::new("compositeFx", Visual)
            .with_alias("mix")
            .with_min_inputs(2)
            .with_default("operation", Text("over".into())),
        TypeDescriptor::new("displaceFx", Visual)
            .with_min_inputs(2)
            .with_default("weight", Float(0.1)),
        TypeDescriptor::new("lookupFx", Visual).with_min_inputs(2),
        TypeDescriptor::new("nullFx", Visual),
        TypeDescriptor::new("outFx", Visual).with_min_inputs(1),
        // --- Channel ---
        TypeDescriptor::new("constantChan", Channel).with_default("value", Float(0.0)),
        TypeDescriptor::new("noiseChan", Channel)
            .with_default("amplitude", Float(1.0))
            .with_default("period", Float(1.0)),
        TypeDescriptor::new("lfoChan", Channel)
            .with_default("frequency", Float(1.0))
            .with_default("shape", Text("sine".into())),
        TypeDescriptor::new("timerChan", Channel)
            .with_default("length", Float(10.0))
            .with_default("running", Boolean(false)),
        TypeDescriptor::new("audioInChan", Channel).with_default("device", Integer(0)),
        TypeDescriptor::new("mouseInChan", Channel),
        TypeDescriptor::new("mathChan", Channel)
            .with_min_inputs(1)
            .with_default("operation", Text("add".into()))
            .with_default("operand", Float(0.0)),
        TypeDescriptor::new("filterChan", Channel)
            .with_min_inputs(1)
            .with_default("width", Float(0.1)),
        TypeDescriptor::new("lagChan", Channel)
            .with_min_inputs(1)
            .with_default("lag", Float(0.2)),
        TypeDescriptor::new("speedChan", Channel).with_min_inputs(1),
        TypeDescriptor::new("logicChan", Channel).with_min_inputs(1),
        TypeDescriptor::new("selectChan", Channel).with_default("channels", Text("*".into())),
        TypeDescriptor::new("nullChan", Channel),
        TypeDescriptor::new("outChan", Channel).with_min_inputs(1),
        // --- Geometry: generators ---
        TypeDescriptor::new("boxGeo", Geometry).with_default("size", Float(1.0)),
        TypeDescriptor::new("sphereGeo", Geometry)
            .with_default("radius", Float(0.5))
            .with_default("rows", Integer(16)),
        TypeDescriptor::new("gridGeo", Geometry)
            .with_default("rows", Integer(10))
            .with_default("columns", Integer(10)),
        TypeDescriptor::new("torusGeo", Geometry).with_default("radius", Float(0.5)),
        TypeDescriptor::new("tubeGeo", Geometry),
        TypeDescriptor::new("lineGeo", Geometry),
        // --- Geometry: modifiers ---
        TypeDescriptor::new("transformGeo", Geometry)
            .with_min_inputs(1)
            .with_default("translate_x", Float(0.0))
            .with_default("translate_y", Float(0.0))
            .with_default("translate_z", Float(0.0)),
        TypeDescriptor::new("twistGeo", Geometry)
            .with_min_inputs(1)
            .with_default("angle", Float(90.0)),
        TypeDescriptor::new("subdivideGeo", Geometry)
            .with_min_inputs(1)
            .with_default("depth", Integer(1)),
        TypeDescriptor::new("extrudeGeo", Geometry)
            .with_min_inputs(1)
            .with_default("depth", Float(0.1)),
        TypeDescriptor::new("facetGeo", Geometry).with_min_inputs(1),
        TypeDescriptor::new("mergeGeo", Geometry).with_min_inputs(1),
        TypeDescriptor::new("booleanGeo", Geometry)
            .with_min_inputs(2)
            .with_default("operation", Text("union".into())),
        TypeDescriptor::new("nullGeo", Geometry),
        TypeDescriptor::new("outGeo", Geometry).with_min_inputs(1),
        // --- Data ---
        TypeDescriptor::new("textDat", Data).with_default("text", Text(String::new())),
        TypeDescriptor::new("tableDat", Data)
            .with_default("rows", Integer(1))
            .with_default("columns", Integer(1)),
        TypeDescriptor::new("scriptDat", Data).with_default("text", Text(String::new())),
        TypeDescriptor::new("jsonDat", Data),
        TypeDescriptor::new("webClientDat", Data).with_default("url", Text(String::new())),
        // --- Container ---
        TypeDescriptor::new("baseComp", Container),
        TypeDescriptor::new("containerComp", Container)
            .with_default("width", Integer(1280))
            .with_default("height", Integer(720)),
        TypeDescriptor::new("geometryComp", Container),
        TypeDescriptor::new("cameraComp", Container).with_default("fov", Float(45.0)),
        TypeDescriptor::new("lightComp", Container).with_default("intensity", Float(1.0)),
        TypeDescriptor::new("windowComp", Container),
        // --- Material ---
        TypeDescriptor::new("phongMat", Material)
            .with_default("diffuse", Text("1 1 1".into()))
            .with_default("shininess", Float(32.0)),
        TypeDescriptor::new("pbrMat", Material)
            .with_default("metallic", Float(0.0))
            .with_default("roughness", Float(0.5)),
        TypeDescriptor::new("constantMat", Material),
        TypeDescriptor::new("wireframeMat", Material).with_default("width", Float(1.0)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_names_are_unique() {
        let types = builtin_types();
        let mut names: Vec<&str> = types.iter().map(|t| t.name.as_str()).collect();
        let total = names.len();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), total);
    }

    #[test]
    fn test_catalog_names_carry_family_suffix() {
        for desc in builtin_types() {
            assert!(
                desc.name.ends_with(desc.family.suffix()),
                "{} missing {} suffix",
                desc.name,
                desc.family.suffix()
            );
        }
    }

    #[test]
    fn test_two_input_types_declare_two_inputs() {
        let types = builtin_types();
        for name in ["compositeFx", "displaceFx", "lookupFx", "booleanGeo"] {
            let desc = types.iter().find(|t| t.name == name).unwrap();
            assert_eq!(desc.min_inputs, 2, "{name}");
        }
    }
}
