//! the CEImetadata units side-file
//!
//! EnSight picks up per-variable unit labels and dimension strings from an
//! XML file next to the case. The labels are inferred from the variable
//! names; variables nothing is known about get empty tags, which EnSight
//! displays as unitless.

use crate::field::units_for;
use crate::write::FieldSpec;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::writer::Writer;

use std::io::Write;

fn start<W: Write>(xml: &mut Writer<W>, name: &str) -> Result<(), quick_xml::Error> {
    xml.write_event(Event::Start(BytesStart::new(name)))
}

fn end<W: Write>(xml: &mut Writer<W>, name: &str) -> Result<(), quick_xml::Error> {
    xml.write_event(Event::End(BytesEnd::new(name)))
}

fn meta_tag<W: Write>(
    xml: &mut Writer<W>,
    name: &str,
    kind: &str,
    value: Option<&str>,
) -> Result<(), quick_xml::Error> {
    let mut tag = BytesStart::new("tag");
    tag.push_attribute(("name", name));
    tag.push_attribute(("type", kind));

    xml.write_event(Event::Start(tag))?;
    if let Some(value) = value {
        xml.write_event(Event::Text(BytesText::new(value)))?;
    }
    end(xml, "tag")
}

fn var_entry<W: Write>(
    xml: &mut Writer<W>,
    name: &str,
    label: &str,
    dims: &str,
) -> Result<(), quick_xml::Error> {
    let mut var = BytesStart::new("var");
    var.push_attribute(("name", name));
    var.push_attribute(("ENS_UNITS_LABEL", label));
    var.push_attribute(("ENS_UNITS_DIMS", dims));

    xml.write_event(Event::Start(var))?;
    end(xml, "var")
}

/// write the side-file content for the given variable set
pub(crate) fn write_units_sidecar<W: Write>(
    writer: W,
    specs: &[FieldSpec],
) -> Result<(), quick_xml::Error> {
    let mut xml = Writer::new_with_indent(writer, b' ', 2);

    xml.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let mut root = BytesStart::new("CEImetadata");
    root.push_attribute(("version", "1.0"));
    xml.write_event(Event::Start(root))?;

    start(&mut xml, "vars")?;

    start(&mut xml, "metatags")?;
    meta_tag(&mut xml, "ENS_UNITS_LABEL", "str", None)?;
    meta_tag(&mut xml, "ENS_UNITS_DIMS", "str", None)?;
    end(&mut xml, "metatags")?;

    start(&mut xml, "varlist")?;
    for spec in specs {
        let (label, dims) = units_for(&spec.name);
        var_entry(&mut xml, &spec.name, label, dims)?;
    }
    // the implicit variables every dataset carries
    var_entry(&mut xml, "Coordinates", "m", "L")?;
    var_entry(&mut xml, "Time", "s", "T")?;
    end(&mut xml, "varlist")?;

    end(&mut xml, "vars")?;

    start(&mut xml, "case")?;
    start(&mut xml, "metatags")?;
    meta_tag(&mut xml, "ENS_UNITS_LABEL", "flt", Some("2.0"))?;
    meta_tag(&mut xml, "ENS_UNITS_DIMS", "flt", Some("1.0"))?;
    meta_tag(&mut xml, "ENS_UNITS_SYSTEM", "flt", Some("1.0"))?;
    meta_tag(&mut xml, "ENS_UNITS_SYSTEM_NAME", "str", Some("SI"))?;
    end(&mut xml, "metatags")?;
    end(&mut xml, "case")?;

    end(&mut xml, "CEImetadata")
}
