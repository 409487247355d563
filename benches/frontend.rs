use criterion::{Criterion, black_box, criterion_group, criterion_main};
use jam2rs::{Converter, SourceUnit, parser, scanner};

const WORKLOAD: &str = r#"
rule Objects sources : grist
{
    local objs = $(sources:S=.o:G=$(grist)) ;
    return $(objs) ;
}

rule Link target : objects
{
    MKDIR $(target:D) ;
    LinkAction $(target) : $(objects) ;
}

actions quietly LinkAction
{
    cc -o $(1) $(2)
}

sources = main.c util.c net/socket.c net/dns.c fmt/print.c ;
objs = [ Objects $(sources) : app ] ;

for obj in $(objs) {
    switch $(obj:S) {
        case .o : compiled += $(obj) ;
        case * : skipped += $(obj) ;
    }
}

if $(compiled) && ! $(skipped) {
    Link bin/app : $(compiled) ;
} else {
    Echo incomplete build: $(skipped:J=,) ;
}

version on bin/app = 1.2.3 ;
on bin/app {
    Echo linking $(version) ;
}
"#;

fn bench_frontend(c: &mut Criterion) {
    c.bench_function("frontend_scan", |b| {
        b.iter(|| {
            let out = scanner::scan(black_box(WORKLOAD));
            black_box(out);
        })
    });

    c.bench_function("frontend_scan_parse", |b| {
        b.iter(|| {
            let out = parser::parse(black_box(WORKLOAD)).expect("parse");
            black_box(out);
        })
    });

    c.bench_function("frontend_convert", |b| {
        let units = [SourceUnit::new("bench.jam", WORKLOAD)];
        let converter = Converter::new();
        b.iter(|| {
            let out = converter.convert_to_rust(black_box(&units)).expect("convert");
            black_box(out);
        })
    });
}

criterion_group!(benches, bench_frontend);
criterion_main!(benches);
