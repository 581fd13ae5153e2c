//! Fixed-structure success documents.
//!
//! The capabilities document is a small static XML template; the two JSON
//! documents follow the shapes the legacy 3D viewer already consumes.

use serde_json::{json, Map, Value};

use crate::{ogc, registry::Model};

/// Renders the 3DPS capabilities document for one model.
///
/// The document always names the single `boreholes` layer and the model's
/// coordinate reference system.
#[must_use]
pub fn capabilities_xml(model: &Model) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<Capabilities xmlns="http://www.opengis.net/3dps/1.0"
              xmlns:ows="http://www.opengis.net/ows/2.0" version="{version}">
  <ows:ServiceIdentification>
    <ows:Title>3D Borehole Portrayal Service</ows:Title>
    <ows:ServiceType>3DPS</ows:ServiceType>
    <ows:ServiceTypeVersion>{version}</ows:ServiceTypeVersion>
    <ows:Profile>{model}</ows:Profile>
  </ows:ServiceIdentification>
  <Contents>
    <Layer>
      <ows:Identifier>{layer}</ows:Identifier>
      <ows:Title>Boreholes</ows:Title>
      <CRS>{crs}</CRS>
    </Layer>
  </Contents>
</Capabilities>
"#,
        version = ogc::VERSION_3DPS,
        model = model.name,
        layer = ogc::LAYER_NAME,
        crs = model.crs,
    )
}

/// Builds a FeatureInfoList document holding exactly one FeatureInfo.
#[must_use]
pub fn feature_info_list(object_id: &str, attributes: &Map<String, Value>) -> Value {
    let attribute_list: Vec<Value> = attributes
        .iter()
        .map(|(name, value)| {
            json!({
                "type": "FeatureAttribute",
                "name": name,
                "value": value,
            })
        })
        .collect();

    json!({
        "type": "FeatureInfoList",
        "totalFeatureInfoCount": 1,
        "featureInfos": [{
            "type": "FeatureInfo",
            "objectId": object_id,
            "featureAttributeList": attribute_list,
        }]
    })
}

/// Wraps the model's ordered resource-id list as a WFS ValueCollection.
#[must_use]
pub fn value_collection(ids: &[String]) -> Value {
    json!({
        "type": "ValueCollection",
        "totalValues": ids.len(),
        "values": ids,
    })
}
